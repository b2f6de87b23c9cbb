use std::sync::Arc;

use crate::{
    client::api::UsersApi,
    users::model::User,
};

const FETCH_DETAIL_FAILED: &str = "Failed to fetch user details";

#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
    Loading,
    Loaded(User),
    /// Fetch failed; the front end offers a way back to the list.
    Failed(String),
}

/// Read-only view of one record.
pub struct DetailController {
    api: Arc<dyn UsersApi>,
    id: String,
    view: DetailView,
}

impl DetailController {
    pub fn new(api: Arc<dyn UsersApi>, id: impl Into<String>) -> Self {
        Self {
            api,
            id: id.into(),
            view: DetailView::Loading,
        }
    }

    pub fn view(&self) -> &DetailView {
        &self.view
    }

    pub async fn load(&mut self) -> &DetailView {
        self.view = match self.api.get(&self.id).await {
            Ok(user) => DetailView::Loaded(user),
            Err(e) => {
                tracing::warn!(error = %e, id = %self.id, "detail fetch failed");
                DetailView::Failed(
                    e.server_message()
                        .unwrap_or(FETCH_DETAIL_FAILED)
                        .to_string(),
                )
            }
        };
        &self.view
    }

    /// Id to open the edit form with, once the record is loaded.
    pub fn edit_target(&self) -> Option<&str> {
        match &self.view {
            DetailView::Loaded(_) => Some(&self.id),
            _ => None,
        }
    }
}
