use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::users::{
    model::{NewUser, User, UserPatch, UserQuery},
    repo_types::UserRow,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email `{0}` is already registered")]
    DuplicateEmail(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistent collection of user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Newest first, then `skip`/`limit`.
    async fn find_page(&self, query: &UserQuery) -> Result<Vec<User>, StoreError>;
    async fn count(&self, search: Option<&str>) -> Result<i64, StoreError>;
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn find_all(&self) -> Result<Vec<User>, StoreError>;
}

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, mobile, gender, status, location, profile, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }
}

/// Escapes LIKE wildcards and wraps the term for a substring match.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn map_write_err(e: sqlx::Error, email: Option<&str>) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::DuplicateEmail(email.unwrap_or_default().to_string());
        }
    }
    StoreError::Other(anyhow::Error::new(e))
}

fn into_users(rows: Vec<UserRow>) -> Result<Vec<User>, StoreError> {
    rows.into_iter()
        .map(|r| User::try_from(r).map_err(StoreError::from))
        .collect()
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (id, first_name, last_name, email, mobile, gender, status, location, profile)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.mobile)
            .bind(user.gender.as_str())
            .bind(user.status.as_str())
            .bind(&user.location)
            .bind(&user.profile)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_err(e, Some(user.email.as_str())))?;
        Ok(User::try_from(row)?)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("find user by id")?;
        Ok(row.map(User::try_from).transpose()?)
    }

    #[instrument(skip(self))]
    async fn find_page(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE $1::text IS NULL
               OR first_name ILIKE $1 ESCAPE '\'
               OR last_name ILIKE $1 ESCAPE '\'
               OR email ILIKE $1 ESCAPE '\'
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(query.search.as_deref().map(like_pattern))
            .bind(query.limit)
            .bind(query.skip)
            .fetch_all(&self.pool)
            .await
            .context("list users")?;
        into_users(rows)
    }

    #[instrument(skip(self))]
    async fn count(&self, search: Option<&str>) -> Result<i64, StoreError> {
        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE $1::text IS NULL
               OR first_name ILIKE $1 ESCAPE '\'
               OR last_name ILIKE $1 ESCAPE '\'
               OR email ILIKE $1 ESCAPE '\'
            "#,
        )
        .bind(search.map(like_pattern))
        .fetch_one(&self.pool)
        .await
        .context("count users")?;
        Ok(total)
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
               SET first_name = COALESCE($2, first_name),
                   last_name  = COALESCE($3, last_name),
                   email      = COALESCE($4, email),
                   mobile     = COALESCE($5, mobile),
                   gender     = COALESCE($6, gender),
                   status     = COALESCE($7, status),
                   location   = COALESCE($8, location),
                   profile    = COALESCE($9, profile)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(patch.first_name.as_deref())
            .bind(patch.last_name.as_deref())
            .bind(patch.email.as_deref())
            .bind(patch.mobile.as_deref())
            .bind(patch.gender.map(|g| g.as_str()))
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.location.as_deref())
            .bind(patch.profile.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_err(e, patch.email.as_deref()))?;
        Ok(row.map(User::try_from).transpose()?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .context("list all users")?;
        into_users(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ada"), "%ada%");
        assert_eq!(like_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }
}
