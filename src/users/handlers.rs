use axum::{
    body::Body,
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, Query, State},
    handler::Handler,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::{AppError, MessageResponse},
    export::EXPORT_FILE_NAME,
    state::AppState,
    users::{
        dto::{ListParams, ListResponse, UserForm},
        model::User,
        services,
    },
};

pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    let body_limit = DefaultBodyLimit::max(max_upload_bytes);
    Router::new()
        .route(
            "/users",
            get(list_users).post(create_user.layer(body_limit.clone())),
        )
        .route("/users/export/csv", get(export_csv))
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user.layer(body_limit))
                .delete(delete_user),
        )
}

/// Non-multipart bodies are answered like any other invalid input.
fn bad_form(rejection: MultipartRejection) -> AppError {
    AppError::Validation(rejection.body_text())
}

#[instrument(skip(state, mp))]
pub async fn create_user(
    State(state): State<AppState>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, HeaderMap, Json<User>), AppError> {
    let form = UserForm::from_multipart(mp.map_err(bad_form)?).await?;
    let user = services::create_user(&state, form).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/users/{}", user.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(user)))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, AppError> {
    services::list_users(&state, &params).await.map(Json)
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    services::get_user(&state, &id).await.map(Json)
}

#[instrument(skip(state, mp))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<User>, AppError> {
    let form = UserForm::from_multipart(mp.map_err(bad_form)?).await?;
    services::update_user(&state, &id, form).await.map(Json)
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete_user(&state, &id).await.map(Json)
}

#[instrument(skip(state))]
pub async fn export_csv(State(state): State<AppState>) -> Result<Response, AppError> {
    let stream = services::export_csv(&state).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
