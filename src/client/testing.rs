use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    client::api::{ClientError, UserDraft, UsersApi},
    export::to_csv,
    users::{
        dto::{page_count, ListResponse},
        model::{matches_search, Gender, Status, User},
    },
};

pub fn sample_user(i: usize) -> User {
    User {
        id: Uuid::new_v4(),
        first_name: format!("User{}", i),
        last_name: "Sample".into(),
        email: format!("user{}@x.com", i),
        mobile: format!("555-{:04}", i),
        gender: Gender::Other,
        status: Status::Active,
        location: "Testville".into(),
        profile: String::new(),
        created_at: OffsetDateTime::UNIX_EPOCH + Duration::seconds(i as i64),
    }
}

/// In-process stand-in for the Record Service. Rows are kept newest first.
#[derive(Default)]
pub struct FakeApi {
    users: Mutex<Vec<User>>,
    list_calls: AtomicUsize,
    fail_list: AtomicBool,
    pub submitted: Mutex<Vec<(Option<String>, UserDraft)>>,
}

impl FakeApi {
    pub fn with_users(n: usize) -> Arc<Self> {
        let api = Self::default();
        {
            let mut users = api.users.lock().unwrap();
            *users = (0..n).rev().map(sample_user).collect();
        }
        Arc::new(api)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fail_next_list(&self) {
        self.fail_list.store(true, Ordering::SeqCst);
    }

    /// Keeps only the newest `n` rows.
    pub fn truncate(&self, n: usize) {
        self.users.lock().unwrap().truncate(n);
    }

    pub fn first_id(&self) -> String {
        self.users.lock().unwrap()[0].id.to_string()
    }

    fn find(&self, id: &str) -> Result<User, ClientError> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id.to_string() == id)
            .cloned()
            .ok_or_else(not_found)
    }
}

fn not_found() -> ClientError {
    ClientError::Api {
        status: 404,
        message: "User not found".into(),
    }
}

fn apply_draft(user: &mut User, draft: &UserDraft) {
    user.first_name = draft.first_name.clone();
    user.last_name = draft.last_name.clone();
    user.email = draft.email.clone();
    user.mobile = draft.mobile.clone();
    user.gender = draft.gender;
    user.status = draft.status;
    user.location = draft.location.clone();
    if let Some(file) = &draft.profile {
        user.profile = format!("uploads/{}", file.file_name);
    }
}

#[async_trait]
impl UsersApi for FakeApi {
    async fn list(&self, page: u64, limit: u64, search: &str) -> Result<ListResponse, ClientError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.swap(false, Ordering::SeqCst) {
            return Err(ClientError::Api {
                status: 500,
                message: "Failed to fetch users".into(),
            });
        }
        let users = self.users.lock().unwrap();
        let matching: Vec<_> = users
            .iter()
            .filter(|u| search.is_empty() || matches_search(u, search))
            .collect();
        let total = matching.len() as u64;
        let rows = matching
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(ListResponse {
            users: rows,
            total,
            page,
            pages: page_count(total, limit),
        })
    }

    async fn get(&self, id: &str) -> Result<User, ClientError> {
        self.find(id)
    }

    async fn create(&self, draft: &UserDraft) -> Result<User, ClientError> {
        self.submitted.lock().unwrap().push((None, draft.clone()));
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == draft.email) {
            return Err(ClientError::Api {
                status: 400,
                message: format!("email `{}` is already registered", draft.email),
            });
        }
        let mut user = sample_user(users.len());
        user.created_at = OffsetDateTime::now_utc();
        apply_draft(&mut user, draft);
        users.insert(0, user.clone());
        Ok(user)
    }

    async fn update(&self, id: &str, draft: &UserDraft) -> Result<User, ClientError> {
        self.submitted
            .lock()
            .unwrap()
            .push((Some(id.to_string()), draft.clone()));
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id.to_string() == id)
            .ok_or_else(not_found)?;
        apply_draft(user, draft);
        Ok(user.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id.to_string() != id);
        if users.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn export_csv(&self) -> Result<Bytes, ClientError> {
        let users = self.users.lock().unwrap();
        if users.is_empty() {
            return Err(not_found());
        }
        let csv = to_csv(&users).map_err(|e| ClientError::Io(std::io::Error::other(e.to_string())))?;
        Ok(Bytes::from(csv))
    }
}
