use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::store::{StoreError, User, UserStore, UserUpdate};

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.into())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, session_id, reset_token, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(backend)?;
        Ok(user)
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, session_id, reset_token, created_at
            FROM users
            WHERE session_id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.db)
        .await
        .map_err(backend)?;
        Ok(user)
    }

    async fn find_by_reset_token(&self, reset_token: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, session_id, reset_token, created_at
            FROM users
            WHERE reset_token = $1
            "#,
        )
        .bind(reset_token)
        .fetch_optional(&self.db)
        .await
        .map_err(backend)?;
        Ok(user)
    }

    async fn insert(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, session_id, reset_token, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::DuplicateEmail,
            _ => backend(e),
        })?;
        Ok(user)
    }

    async fn update(&self, user_id: Uuid, update: UserUpdate) -> Result<(), StoreError> {
        // One statement per record: a concurrent update never observes a
        // half-applied field set.
        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = CASE WHEN $2 THEN $3 ELSE password_hash END,
                session_id    = CASE WHEN $4 THEN $5 ELSE session_id END,
                reset_token   = CASE WHEN $6 THEN $7 ELSE reset_token END
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(update.password_hash.is_some())
        .bind(update.password_hash)
        .bind(update.session_id.is_some())
        .bind(update.session_id.flatten())
        .bind(update.reset_token.is_some())
        .bind(update.reset_token.flatten())
        .execute(&self.db)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
