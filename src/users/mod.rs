pub mod dto;
pub mod handlers;
pub mod memory;
pub mod model;
pub mod repo;
mod repo_types;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    handlers::routes(max_upload_bytes)
}
