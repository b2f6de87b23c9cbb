use axum::extract::Multipart;
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    storage::UploadedFile,
    users::model::{User, UserFields},
};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 5;

/// Raw list query. Values are kept as text so that garbage falls back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
}

impl ListParams {
    pub fn page(&self) -> u64 {
        positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u64 {
        positive(self.limit.as_deref()).unwrap_or(DEFAULT_LIMIT)
    }

    pub fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn positive(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResponse {
    pub users: Vec<User>,
    pub total: u64,
    pub page: u64,
    pub pages: u64,
}

pub fn page_count(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit)
}

/// Decoded create/update request.
#[derive(Debug, Default)]
pub struct UserForm {
    pub fields: UserFields,
    pub profile: Option<UploadedFile>,
}

impl UserForm {
    /// Reads every part; the `profile` part is the only file accepted.
    pub async fn from_multipart(mut mp: Multipart) -> Result<Self, AppError> {
        let mut form = UserForm::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("malformed multipart body: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == "profile" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read profile: {}", e)))?;
                if body.is_empty() && file_name.as_deref().map_or(true, str::is_empty) {
                    continue;
                }
                if form.profile.is_some() {
                    return Err(AppError::Validation("only one profile file is accepted".into()));
                }
                form.profile = Some(UploadedFile {
                    file_name,
                    content_type,
                    body,
                });
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read {}: {}", name, e)))?;
            if !form.fields.set(&name, value) {
                tracing::debug!(field = %name, "ignoring unknown form field");
            }
        }
        Ok(form)
    }
}
