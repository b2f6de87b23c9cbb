use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use time::{Date, OffsetDateTime};
use tokio::time::Instant;

use crate::{
    client::{
        api::{ClientError, UsersApi},
        debounce::{Debounce, SEARCH_DEBOUNCE},
        notify::Notifier,
        pagination::Paging,
    },
    users::{dto::ListResponse, model::User},
};

const FETCH_FAILED: &str = "Failed to fetch users";
const MAX_CLAMP_REFETCHES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Loading,
    Loaded,
    Empty,
    Error,
}

/// Parameters of one in-flight list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    pub page: u64,
    pub limit: u64,
    pub search: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// A newer request was issued; the response was dropped.
    Stale,
    Done,
    /// The page was past the end and has been clamped; fetch again.
    Refetch,
}

pub fn export_file_name(date: Date) -> String {
    format!("users-{}.csv", date)
}

/// State behind the list view: search, pagination, delete and export.
pub struct ListController {
    api: Arc<dyn UsersApi>,
    notifier: Notifier,
    state: ViewState,
    search_input: String,
    search: String,
    debounce: Debounce<String>,
    paging: Paging,
    users: Vec<User>,
    seq: u64,
}

impl ListController {
    pub fn new(api: Arc<dyn UsersApi>, notifier: Notifier, page_size: u64) -> Self {
        Self {
            api,
            notifier,
            state: ViewState::Idle,
            search_input: String::new(),
            search: String::new(),
            debounce: Debounce::new(SEARCH_DEBOUNCE),
            paging: Paging::new(page_size),
            users: Vec::new(),
            seq: 0,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn paging(&self) -> &Paging {
        &self.paging
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn can_export(&self) -> bool {
        self.paging.total > 0
    }

    pub fn set_search_input(&mut self, text: impl Into<String>) {
        self.search_input = text.into();
        self.debounce.push(self.search_input.clone(), Instant::now());
    }

    /// Applies the debounced search if its quiet period is over.
    pub async fn poll_search(&mut self) -> bool {
        match self.debounce.poll(Instant::now()) {
            Some(term) => {
                self.apply_search(term).await;
                true
            }
            None => false,
        }
    }

    /// Waits out the quiet period of a pending search and applies it.
    pub async fn settle_search(&mut self) -> bool {
        if let Some(at) = self.debounce.deadline() {
            tokio::time::sleep_until(at).await;
        }
        self.poll_search().await
    }

    async fn apply_search(&mut self, term: String) {
        let term = term.trim().to_string();
        let changed = term != self.search;
        self.search = term;
        let moved = self.paging.reset();
        if changed || moved {
            self.refresh().await;
        }
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.seq += 1;
        self.state = ViewState::Loading;
        FetchTicket {
            seq: self.seq,
            page: self.paging.page,
            limit: self.paging.page_size,
            search: self.search.clone(),
        }
    }

    pub fn apply(&mut self, ticket: &FetchTicket, result: Result<ListResponse, ClientError>) -> Applied {
        if ticket.seq != self.seq {
            tracing::debug!(seq = ticket.seq, latest = self.seq, "dropping stale list response");
            return Applied::Stale;
        }
        match result {
            Ok(res) => {
                if self.paging.record(res.total, res.pages).is_some() {
                    return Applied::Refetch;
                }
                self.users = res.users;
                self.state = if self.users.is_empty() {
                    ViewState::Empty
                } else {
                    ViewState::Loaded
                };
            }
            Err(e) => {
                tracing::warn!(error = %e, "list fetch failed");
                self.users.clear();
                self.state = ViewState::Error;
                self.notifier.error(FETCH_FAILED);
            }
        }
        Applied::Done
    }

    pub async fn refresh(&mut self) {
        for _ in 0..=MAX_CLAMP_REFETCHES {
            let ticket = self.begin_fetch();
            let result = self
                .api
                .list(ticket.page, ticket.limit, &ticket.search)
                .await;
            if self.apply(&ticket, result) != Applied::Refetch {
                return;
            }
        }
    }

    pub async fn go_to_page(&mut self, page: u64) {
        if self.paging.go_to(page) {
            self.refresh().await;
        }
    }

    pub async fn next_page(&mut self) {
        if self.paging.next() {
            self.refresh().await;
        }
    }

    pub async fn prev_page(&mut self) {
        if self.paging.prev() {
            self.refresh().await;
        }
    }

    pub async fn set_page_size(&mut self, size: u64) {
        if self.paging.set_page_size(size) {
            self.refresh().await;
        }
    }

    /// Deletes after `confirm` agrees. Returns whether the record was removed.
    pub async fn delete(&mut self, id: &str, confirm: impl FnOnce() -> bool) -> bool {
        if !confirm() {
            return false;
        }
        let rows_before = self.users.len();
        match self.api.delete(id).await {
            Ok(()) => {
                self.notifier.success("User deleted");
                self.paging.after_delete(rows_before);
                self.refresh().await;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, %id, "delete failed");
                self.notifier.error("Failed to delete user");
                false
            }
        }
    }

    /// Downloads the CSV export into `dir` as `users-<date>.csv`.
    pub async fn export(&mut self, dir: &Path) -> Option<PathBuf> {
        if !self.can_export() {
            self.notifier.info("No users to export");
            return None;
        }
        self.notifier.info("Exporting users...");

        let bytes = match self.api.export_csv().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "export failed");
                self.notifier.error("CSV export failed");
                return None;
            }
        };

        let path = dir.join(export_file_name(OffsetDateTime::now_utc().date()));
        match tokio::fs::write(&path, &bytes).await {
            Ok(()) => {
                self.notifier
                    .success(format!("Exported users to {}", path.display()));
                Some(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "saving export failed");
                self.notifier.error("CSV export failed");
                None
            }
        }
    }
}
