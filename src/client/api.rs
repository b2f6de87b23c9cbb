use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, Response};
use thiserror::Error;

use crate::{
    error::MessageResponse,
    users::{
        dto::ListResponse,
        model::{Gender, Status, User},
    },
};

#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error status.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { message, .. } if !message.is_empty() => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { status: 404, .. })
    }
}

/// Image picked in the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Form values submitted by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub gender: Gender,
    pub status: Status,
    pub location: String,
    pub profile: Option<ProfileFile>,
}

impl UserDraft {
    pub fn from_user(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            mobile: user.mobile.clone(),
            gender: user.gender,
            status: user.status,
            location: user.location.clone(),
            profile: None,
        }
    }

    /// Always multipart, whether or not a file is attached.
    pub fn to_form(&self) -> Result<multipart::Form, ClientError> {
        let mut form = multipart::Form::new()
            .text("firstName", self.first_name.clone())
            .text("lastName", self.last_name.clone())
            .text("email", self.email.clone())
            .text("mobile", self.mobile.clone())
            .text("gender", self.gender.as_str())
            .text("status", self.status.as_str())
            .text("location", self.location.clone());

        if let Some(file) = &self.profile {
            let mut part =
                multipart::Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
            if let Some(ct) = &file.content_type {
                part = part.mime_str(ct)?;
            }
            form = form.part("profile", part);
        }
        Ok(form)
    }
}

/// Operations the views need from the Record Service.
#[async_trait]
pub trait UsersApi: Send + Sync {
    async fn list(&self, page: u64, limit: u64, search: &str) -> Result<ListResponse, ClientError>;
    async fn get(&self, id: &str) -> Result<User, ClientError>;
    async fn create(&self, draft: &UserDraft) -> Result<User, ClientError>;
    async fn update(&self, id: &str, draft: &UserDraft) -> Result<User, ClientError>;
    async fn delete(&self, id: &str) -> Result<(), ClientError>;
    async fn export_csv(&self) -> Result<Bytes, ClientError>;
}

pub struct HttpUsersApi {
    http: Client,
    base_url: String,
}

impl HttpUsersApi {
    pub fn new(base_url: impl Into<String>) -> Result<Arc<dyn UsersApi>, ClientError> {
        let http = Client::builder()
            .user_agent(concat!("usersdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Arc::new(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }) as Arc<dyn UsersApi>)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(res: Response) -> Result<Response, ClientError> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<MessageResponse>(&body)
            .map(|m| m.message)
            .unwrap_or_else(|_| format!("request failed with status {}", status.as_u16()));
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl UsersApi for HttpUsersApi {
    async fn list(&self, page: u64, limit: u64, search: &str) -> Result<ListResponse, ClientError> {
        let res = self
            .http
            .get(self.url("/users"))
            .query(&[
                ("page", page.to_string()),
                ("limit", limit.to_string()),
                ("search", search.to_string()),
            ])
            .send()
            .await?;
        Ok(Self::check(res).await?.json::<ListResponse>().await?)
    }

    async fn get(&self, id: &str) -> Result<User, ClientError> {
        let res = self.http.get(self.url(&format!("/users/{}", id))).send().await?;
        Ok(Self::check(res).await?.json::<User>().await?)
    }

    async fn create(&self, draft: &UserDraft) -> Result<User, ClientError> {
        let res = self
            .http
            .post(self.url("/users"))
            .multipart(draft.to_form()?)
            .send()
            .await?;
        Ok(Self::check(res).await?.json::<User>().await?)
    }

    async fn update(&self, id: &str, draft: &UserDraft) -> Result<User, ClientError> {
        let res = self
            .http
            .put(self.url(&format!("/users/{}", id)))
            .multipart(draft.to_form()?)
            .send()
            .await?;
        Ok(Self::check(res).await?.json::<User>().await?)
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let res = self
            .http
            .delete(self.url(&format!("/users/{}", id)))
            .send()
            .await?;
        Self::check(res).await?;
        Ok(())
    }

    async fn export_csv(&self) -> Result<Bytes, ClientError> {
        let res = self.http.get(self.url("/users/export/csv")).send().await?;
        Ok(Self::check(res).await?.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_only_for_api_errors() {
        let err = ClientError::Api {
            status: 404,
            message: "User not found".into(),
        };
        assert_eq!(err.server_message(), Some("User not found"));
        assert!(err.is_not_found());

        let io = ClientError::Io(std::io::Error::other("disk"));
        assert_eq!(io.server_message(), None);
    }
}
