use axum::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,                    // unique user ID, assigned at creation
    pub email: String,               // unique login email, case-sensitive
    #[serde(skip_serializing)]
    pub password_hash: String,       // Argon2 hash, not exposed in JSON
    pub session_id: Option<String>,  // set while a session is active
    pub reset_token: Option<String>, // set while a password reset is outstanding
    pub created_at: OffsetDateTime,  // creation timestamp
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Partial update of a user record.
///
/// Outer `None` leaves the column untouched; `Some(None)` clears a nullable
/// column. A store must apply all named fields in one atomic step.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub password_hash: Option<String>,
    pub session_id: Option<Option<String>>,
    pub reset_token: Option<Option<String>>,
}

/// Lookup and mutation of user records by unique key.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_reset_token(&self, reset_token: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;
    async fn update(&self, user_id: Uuid, update: UserUpdate) -> Result<(), StoreError>;
}
