use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::users::{
    model::{matches_search, NewUser, User, UserPatch, UserQuery},
    repo::{StoreError, UserStore},
};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, (u64, User)>,
    next_seq: u64,
    last_created: Option<OffsetDateTime>,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|(_, u)| u.email == email && Some(u.id) != except)
    }

    /// Newest first; insertion order breaks timestamp ties.
    fn sorted<'a>(&'a self, search: Option<&'a str>) -> Vec<&'a (u64, User)> {
        let mut rows: Vec<_> = self
            .users
            .values()
            .filter(|(_, u)| search.map_or(true, |term| matches_search(u, term)))
            .collect();
        rows.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));
        rows
    }
}

/// Process-local store used by tests and `STORE_BACKEND=memory`.
#[derive(Default)]
pub struct InMemoryUserStore {
    inner: RwLock<Inner>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&user.email, None) {
            return Err(StoreError::DuplicateEmail(user.email));
        }

        let now = OffsetDateTime::now_utc();
        let created_at = match inner.last_created {
            Some(last) if last > now => last,
            _ => now,
        };
        inner.last_created = Some(created_at);

        let record = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            mobile: user.mobile,
            gender: user.gender,
            status: user.status,
            location: user.location,
            profile: user.profile,
            created_at,
        };
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.users.insert(record.id, (seq, record.clone()));
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).map(|(_, u)| u.clone()))
    }

    async fn find_page(&self, query: &UserQuery) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        let skip = usize::try_from(query.skip.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit.max(0)).unwrap_or(usize::MAX);
        Ok(inner
            .sorted(query.search.as_deref())
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|(_, u)| u.clone())
            .collect())
    }

    async fn count(&self, search: Option<&str>) -> Result<i64, StoreError> {
        let inner = self.inner.read().await;
        let total = inner
            .users
            .values()
            .filter(|(_, u)| search.map_or(true, |term| matches_search(u, term)))
            .count();
        Ok(total as i64)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&id) {
            return Ok(None);
        }
        if let Some(email) = &patch.email {
            if inner.email_taken(email, Some(id)) {
                return Err(StoreError::DuplicateEmail(email.clone()));
            }
        }
        Ok(inner.users.get_mut(&id).map(|(_, user)| {
            patch.apply(user);
            user.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.remove(&id).is_some())
    }

    async fn find_all(&self) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.sorted(None).into_iter().map(|(_, u)| u.clone()).collect())
    }
}
