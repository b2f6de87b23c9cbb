use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            other => Err(format!("`{}` is not a valid gender", other)),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status. `Inactive` is the canonical spelling; `InActive` is
/// still accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Active,
    #[serde(alias = "InActive")]
    Inactive,
}

impl Status {
    pub const ALL: [Status; 2] = [Status::Active, Status::Inactive];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "Active",
            Status::Inactive => "Inactive",
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "inactive" => Ok(Status::Inactive),
            other => Err(format!("`{}` is not a valid status", other)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub gender: Gender,
    pub status: Status,
    pub location: String,
    /// Public path of the uploaded image, empty when none was ever uploaded.
    #[serde(default)]
    pub profile: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Text fields of a create/update request exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub gender: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
}

impl UserFields {
    /// Assigns a multipart/form field by its wire name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "firstName" => &mut self.first_name,
            "lastName" => &mut self.last_name,
            "email" => &mut self.email,
            "mobile" => &mut self.mobile,
            "gender" => &mut self.gender,
            "status" => &mut self.status,
            "location" => &mut self.location,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

/// A validated record ready for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub gender: Gender,
    pub status: Status,
    pub location: String,
    pub profile: String,
}

impl NewUser {
    pub fn from_fields(fields: UserFields) -> Result<Self, AppError> {
        let mut problems = Vec::new();

        let first_name = required(&mut problems, "firstName", fields.first_name);
        let last_name = required(&mut problems, "lastName", fields.last_name);
        let email = required(&mut problems, "email", fields.email).map(|e| e.to_lowercase());
        let mobile = required(&mut problems, "mobile", fields.mobile);
        let gender = required(&mut problems, "gender", fields.gender)
            .and_then(|g| parse_enum::<Gender>(&mut problems, "gender", &g));
        let status = match non_blank(fields.status) {
            Some(s) => parse_enum::<Status>(&mut problems, "status", &s),
            None => Some(Status::Active),
        };
        let location = required(&mut problems, "location", fields.location);

        match (first_name, last_name, email, mobile, gender, status, location) {
            (
                Some(first_name),
                Some(last_name),
                Some(email),
                Some(mobile),
                Some(gender),
                Some(status),
                Some(location),
            ) if problems.is_empty() => Ok(Self {
                first_name,
                last_name,
                email,
                mobile,
                gender,
                status,
                location,
                profile: String::new(),
            }),
            _ => Err(validation_failed(problems)),
        }
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile.unwrap_or_default();
        self
    }
}

/// Partial replacement; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub gender: Option<Gender>,
    pub status: Option<Status>,
    pub location: Option<String>,
    pub profile: Option<String>,
}

impl UserPatch {
    /// Absent fields are left alone. A field that is present must still carry
    /// a non-blank value, the same rule inserts follow.
    pub fn from_fields(fields: UserFields) -> Result<Self, AppError> {
        let mut problems = Vec::new();

        let patch = Self {
            first_name: present(&mut problems, "firstName", fields.first_name),
            last_name: present(&mut problems, "lastName", fields.last_name),
            email: present(&mut problems, "email", fields.email).map(|e| e.to_lowercase()),
            mobile: present(&mut problems, "mobile", fields.mobile),
            gender: present(&mut problems, "gender", fields.gender)
                .and_then(|g| parse_enum::<Gender>(&mut problems, "gender", &g)),
            status: present(&mut problems, "status", fields.status)
                .and_then(|s| parse_enum::<Status>(&mut problems, "status", &s)),
            location: present(&mut problems, "location", fields.location),
            profile: None,
        };

        if problems.is_empty() {
            Ok(patch)
        } else {
            Err(validation_failed(problems))
        }
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(v) = &self.first_name {
            user.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            user.last_name = v.clone();
        }
        if let Some(v) = &self.email {
            user.email = v.clone();
        }
        if let Some(v) = &self.mobile {
            user.mobile = v.clone();
        }
        if let Some(v) = self.gender {
            user.gender = v;
        }
        if let Some(v) = self.status {
            user.status = v;
        }
        if let Some(v) = &self.location {
            user.location = v.clone();
        }
        if let Some(v) = &self.profile {
            user.profile = v.clone();
        }
    }
}

/// Page request handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub search: Option<String>,
    pub skip: i64,
    pub limit: i64,
}

impl UserQuery {
    pub fn matches(&self, user: &User) -> bool {
        match &self.search {
            None => true,
            Some(term) => matches_search(user, term),
        }
    }
}

/// Case-insensitive substring match over first name, last name and email.
pub fn matches_search(user: &User, term: &str) -> bool {
    let needle = term.to_lowercase();
    [&user.first_name, &user.last_name, &user.email]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(problems: &mut Vec<String>, name: &str, value: Option<String>) -> Option<String> {
    let value = non_blank(value);
    if value.is_none() {
        problems.push(format!("{} is required", name));
    }
    value
}

fn present(problems: &mut Vec<String>, name: &str, value: Option<String>) -> Option<String> {
    let raw = value?;
    let trimmed = raw.trim().to_string();
    if trimmed.is_empty() {
        problems.push(format!("{} is required", name));
        return None;
    }
    Some(trimmed)
}

fn parse_enum<T: FromStr<Err = String>>(
    problems: &mut Vec<String>,
    name: &str,
    raw: &str,
) -> Option<T> {
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            problems.push(format!("{}: {}", name, e));
            None
        }
    }
}

fn validation_failed(problems: Vec<String>) -> AppError {
    AppError::Validation(format!("User validation failed: {}", problems.join(", ")))
}
