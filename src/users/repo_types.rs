use anyhow::anyhow;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::model::{Gender, Status, User};

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub gender: String,
    pub status: String,
    pub location: String,
    pub profile: String,
    pub created_at: OffsetDateTime,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            first_name: r.first_name,
            last_name: r.last_name,
            email: r.email,
            mobile: r.mobile,
            gender: r.gender.parse::<Gender>().map_err(|e| anyhow!(e))?,
            status: r.status.parse::<Status>().map_err(|e| anyhow!(e))?,
            location: r.location,
            profile: r.profile,
            created_at: r.created_at,
        })
    }
}
