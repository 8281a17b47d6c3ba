use std::collections::HashMap;
use std::sync::Mutex;

use axum::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::store::{StoreError, User, UserStore, UserUpdate};

/// In-memory user store. Backs unit tests and DB-less runs; the single lock
/// makes every operation atomic with respect to a record.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, User>> {
        // A poisoned lock only happens if a holder panicked; the map itself
        // is never left half-written, so keep serving.
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().values().find(|u| u.email == email).cloned())
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .values()
            .find(|u| u.session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn find_by_reset_token(&self, reset_token: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .values()
            .find(|u| u.reset_token.as_deref() == Some(reset_token))
            .cloned())
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut users = self.lock();
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            session_id: None,
            reset_token: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user_id: Uuid, update: UserUpdate) -> Result<(), StoreError> {
        let mut users = self.lock();
        let user = users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        if let Some(password_hash) = update.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(session_id) = update.session_id {
            user.session_id = session_id;
        }
        if let Some(reset_token) = update.reset_token {
            user.reset_token = reset_token;
        }
        Ok(())
    }
}
