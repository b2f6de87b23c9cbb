use std::{collections::BTreeMap, sync::Arc};

use crate::{
    client::{
        api::{ClientError, ProfileFile, UserDraft, UsersApi},
        notify::Notifier,
    },
    users::model::{Gender, Status, User},
};

const GENERIC_FAILURE: &str = "An error occurred";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Saved; the caller goes back to the list.
    Saved(User),
    /// Client-side validation failed, see [`FormController::errors`].
    Invalid,
    /// The server refused; the message has been shown.
    Failed(String),
}

/// Create/edit form. Edit mode is chosen by the presence of an id.
pub struct FormController {
    api: Arc<dyn UsersApi>,
    notifier: Notifier,
    mode: FormMode,
    draft: UserDraft,
    existing_profile: String,
    errors: BTreeMap<&'static str, &'static str>,
}

impl FormController {
    pub fn create(api: Arc<dyn UsersApi>, notifier: Notifier) -> Self {
        Self {
            api,
            notifier,
            mode: FormMode::Create,
            draft: UserDraft::default(),
            existing_profile: String::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Opens the form for `id`, pre-filled from the stored record. The file
    /// input starts empty; the stored image is kept unless a new one is chosen.
    pub async fn edit(
        api: Arc<dyn UsersApi>,
        notifier: Notifier,
        id: &str,
    ) -> Result<Self, ClientError> {
        let user = api.get(id).await?;
        Ok(Self {
            draft: UserDraft::from_user(&user),
            existing_profile: user.profile,
            mode: FormMode::Edit(id.to_string()),
            api,
            notifier,
            errors: BTreeMap::new(),
        })
    }

    /// Mode chosen by the presence of a route id.
    pub async fn open(
        api: Arc<dyn UsersApi>,
        notifier: Notifier,
        id: Option<&str>,
    ) -> Result<Self, ClientError> {
        match id {
            Some(id) => Self::edit(api, notifier, id).await,
            None => Ok(Self::create(api, notifier)),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn draft(&self) -> &UserDraft {
        &self.draft
    }

    pub fn existing_profile(&self) -> &str {
        &self.existing_profile
    }

    pub fn errors(&self) -> &BTreeMap<&'static str, &'static str> {
        &self.errors
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Create => "Add User",
            FormMode::Edit(_) => "Edit User",
        }
    }

    /// Sets a field by its form name.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<(), String> {
        let value = value.to_string();
        match name {
            "firstName" => self.draft.first_name = value,
            "lastName" => self.draft.last_name = value,
            "email" => self.draft.email = value,
            "mobile" => self.draft.mobile = value,
            "location" => self.draft.location = value,
            "gender" => self.draft.gender = value.parse::<Gender>()?,
            "status" => self.draft.status = value.parse::<Status>()?,
            other => return Err(format!("unknown field `{}`", other)),
        }
        self.errors.remove(name);
        Ok(())
    }

    pub fn attach_profile(&mut self, file: ProfileFile) {
        self.draft.profile = Some(file);
    }

    /// Required fields only; email format and lengths are left to the server.
    pub fn validate(&mut self) -> bool {
        self.errors.clear();
        let checks = [
            ("firstName", &self.draft.first_name, "First name is required"),
            ("lastName", &self.draft.last_name, "Last name is required"),
            ("email", &self.draft.email, "Email is required"),
            ("mobile", &self.draft.mobile, "Mobile number is required"),
            ("location", &self.draft.location, "Location is required"),
        ];
        for (key, value, message) in checks {
            if value.trim().is_empty() {
                self.errors.insert(key, message);
            }
        }
        self.errors.is_empty()
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        if !self.validate() {
            return SubmitOutcome::Invalid;
        }

        let result = match &self.mode {
            FormMode::Create => self.api.create(&self.draft).await,
            FormMode::Edit(id) => self.api.update(id, &self.draft).await,
        };

        match result {
            Ok(user) => {
                let text = match self.mode {
                    FormMode::Create => "User created successfully",
                    FormMode::Edit(_) => "User updated successfully",
                };
                self.notifier.success(text);
                SubmitOutcome::Saved(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "form submission failed");
                let message = e.server_message().unwrap_or(GENERIC_FAILURE).to_string();
                self.notifier.error(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }
}
