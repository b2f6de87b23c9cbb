use bytes::Bytes;
use futures::Stream;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, MessageResponse},
    state::AppState,
    users::{
        dto::{page_count, ListParams, ListResponse, UserForm},
        model::{NewUser, User, UserPatch, UserQuery},
        repo::StoreError,
    },
};

pub const LIST_FAILED: &str = "Failed to fetch users";
pub const USER_NOT_FOUND: &str = "User not found";
pub const USER_DELETED: &str = "User deleted successfully";
pub const NOTHING_TO_EXPORT: &str = "No users found to export";

pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn malformed_id(raw: &str) -> String {
    format!("invalid user id `{}`", raw)
}

/// Rejections by the store become validation errors; anything else is a
/// server failure.
fn write_error(e: StoreError) -> AppError {
    match e {
        dup @ StoreError::DuplicateEmail(_) => AppError::Validation(dup.to_string()),
        StoreError::Other(e) => {
            error!(error = %e, "store write failed");
            AppError::server(e)
        }
    }
}

async fn store_profile(st: &AppState, form: &mut UserForm) -> Result<Option<String>, AppError> {
    let Some(file) = form.profile.take() else {
        return Ok(None);
    };
    st.files.put(file).await.map(Some).map_err(|e| {
        error!(error = %e, "storing profile upload failed");
        AppError::Server("Failed to store profile image".into())
    })
}

/// Best effort: removes an upload whose record write did not go through.
async fn discard_profile(st: &AppState, profile: Option<String>) {
    if let Some(path) = profile {
        if let Err(e) = st.files.remove(&path).await {
            warn!(error = %e, %path, "failed to discard orphaned upload");
        }
    }
}

pub async fn create_user(st: &AppState, mut form: UserForm) -> Result<User, AppError> {
    let new_user = NewUser::from_fields(std::mem::take(&mut form.fields))?;
    let profile = store_profile(st, &mut form).await?;

    match st.store.insert(new_user.with_profile(profile.clone())).await {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user created");
            Ok(user)
        }
        Err(e) => {
            warn!(error = %e, "create user rejected");
            discard_profile(st, profile).await;
            Err(write_error(e))
        }
    }
}

pub async fn list_users(st: &AppState, params: &ListParams) -> Result<ListResponse, AppError> {
    let page = params.page();
    let limit = params.limit();
    let search = params.search().map(str::to_string);

    let skip = (page - 1).saturating_mul(limit);
    let query = UserQuery {
        search: search.clone(),
        skip: i64::try_from(skip).unwrap_or(i64::MAX),
        limit: i64::try_from(limit).unwrap_or(i64::MAX),
    };

    let (users, total) = tokio::try_join!(
        st.store.find_page(&query),
        st.store.count(search.as_deref())
    )
    .map_err(|e| {
        error!(error = %e, page, limit, "list users failed");
        AppError::Server(LIST_FAILED.into())
    })?;

    let total = u64::try_from(total).unwrap_or_default();
    Ok(ListResponse {
        users,
        total,
        page,
        pages: page_count(total, limit),
    })
}

pub async fn get_user(st: &AppState, raw_id: &str) -> Result<User, AppError> {
    let id = parse_id(raw_id).ok_or_else(|| AppError::Server(malformed_id(raw_id)))?;
    st.store
        .find_by_id(id)
        .await
        .map_err(|e| {
            error!(error = %e, %id, "get user failed");
            AppError::server(e)
        })?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.into()))
}

pub async fn update_user(st: &AppState, raw_id: &str, mut form: UserForm) -> Result<User, AppError> {
    let id = parse_id(raw_id).ok_or_else(|| AppError::Validation(malformed_id(raw_id)))?;
    let patch = UserPatch::from_fields(std::mem::take(&mut form.fields))?;
    let profile = store_profile(st, &mut form).await?;

    match st.store.update(id, patch.with_profile(profile.clone())).await {
        Ok(Some(user)) => {
            info!(user_id = %user.id, profile_replaced = profile.is_some(), "user updated");
            Ok(user)
        }
        Ok(None) => {
            discard_profile(st, profile).await;
            Err(AppError::NotFound(USER_NOT_FOUND.into()))
        }
        Err(e) => {
            warn!(error = %e, %id, "update user rejected");
            discard_profile(st, profile).await;
            Err(write_error(e))
        }
    }
}

pub async fn delete_user(st: &AppState, raw_id: &str) -> Result<MessageResponse, AppError> {
    let id = parse_id(raw_id).ok_or_else(|| AppError::Server(malformed_id(raw_id)))?;
    let removed = st.store.delete(id).await.map_err(|e| {
        error!(error = %e, %id, "delete user failed");
        AppError::server(e)
    })?;
    if !removed {
        return Err(AppError::NotFound(USER_NOT_FOUND.into()));
    }
    info!(user_id = %id, "user deleted");
    Ok(MessageResponse::new(USER_DELETED))
}

pub async fn export_csv(
    st: &AppState,
) -> Result<impl Stream<Item = std::io::Result<Bytes>> + Send + 'static, AppError> {
    let users = st.store.find_all().await.map_err(|e| {
        error!(error = %e, "loading users for export failed");
        AppError::server(e)
    })?;
    if users.is_empty() {
        return Err(AppError::NotFound(NOTHING_TO_EXPORT.into()));
    }

    let stream = st.exporter.export(&users).await.map_err(|e| {
        error!(error = %e, "csv export failed");
        AppError::Server("Failed to export users".into())
    })?;
    info!(rows = users.len(), "csv export ready");
    Ok(stream)
}
