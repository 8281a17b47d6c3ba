use std::sync::Arc;

use axum::extract::FromRef;
use thiserror::Error;
use tokio::task;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::store::{StoreError, User, UserStore, UserUpdate};
use crate::auth::{password, token};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already registered")]
    AlreadyRegistered,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid reset token")]
    InvalidToken,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("password hashing failed: {0}")]
    Hashing(#[source] anyhow::Error),
}

/// Registration, login, session, and password-reset workflows over a
/// [`UserStore`].
///
/// Login and session lookups collapse "no such user" into `false`/`None` so
/// callers cannot probe which emails are registered. The reset-token
/// operations already require proof of email or token possession and fail
/// loudly instead.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Register a new user. Exactly one of success or `AlreadyRegistered`
    /// per call; nothing is written on failure.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        if self.store.find_by_email(email).await?.is_some() {
            warn!(%email, "registration attempt for existing email");
            return Err(AuthError::AlreadyRegistered);
        }
        let hash = hash_blocking(password.to_string()).await?;
        let user = match self.store.insert(email, &hash).await {
            Ok(user) => user,
            // a concurrent registration can win between the lookup and the insert
            Err(StoreError::DuplicateEmail) => return Err(AuthError::AlreadyRegistered),
            Err(e) => return Err(e.into()),
        };
        info!(user_id = %user.id, %email, "user registered");
        Ok(user)
    }

    /// Check credentials. An unknown email and a wrong password are
    /// indistinguishable to the caller.
    pub async fn validate_login(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            return Ok(false);
        };
        let password = password.to_string();
        let hash = user.password_hash;
        let ok = task::spawn_blocking(move || password::verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.into()))?;
        Ok(ok)
    }

    /// Open a session for the user, returning the new session token.
    /// Any prior session token stops resolving: one session per user,
    /// last writer wins. Unknown emails yield `None`.
    pub async fn create_session(&self, email: &str) -> Result<Option<String>, AuthError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            return Ok(None);
        };
        let session_id = token::generate_token();
        self.store
            .update(
                user.id,
                UserUpdate {
                    session_id: Some(Some(session_id.clone())),
                    ..Default::default()
                },
            )
            .await?;
        debug!(user_id = %user.id, "session created");
        Ok(Some(session_id))
    }

    /// Resolve a session token to its user. A missing or unknown token is a
    /// normal miss, never an error.
    pub async fn user_by_session(
        &self,
        session_id: Option<&str>,
    ) -> Result<Option<User>, AuthError> {
        let Some(session_id) = session_id else {
            return Ok(None);
        };
        Ok(self.store.find_by_session_id(session_id).await?)
    }

    /// Clear the user's session. Idempotent: a `None` id, an unknown id, and
    /// an already-cleared session are all quiet no-ops.
    pub async fn destroy_session(&self, user_id: Option<Uuid>) -> Result<(), AuthError> {
        let Some(user_id) = user_id else {
            return Ok(());
        };
        match self
            .store
            .update(
                user_id,
                UserUpdate {
                    session_id: Some(None),
                    ..Default::default()
                },
            )
            .await
        {
            Ok(()) => {
                debug!(%user_id, "session destroyed");
                Ok(())
            }
            Err(StoreError::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Issue a password-reset token, replacing any outstanding one.
    pub async fn issue_reset_token(&self, email: &str) -> Result<String, AuthError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            warn!(%email, "reset token requested for unknown email");
            return Err(AuthError::UserNotFound);
        };
        let reset_token = token::generate_token();
        self.store
            .update(
                user.id,
                UserUpdate {
                    reset_token: Some(Some(reset_token.clone())),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user.id, "password reset token issued");
        Ok(reset_token)
    }

    /// Redeem a reset token: store the new password hash and consume the
    /// token in one record update, so there is no window where the old token
    /// is still redeemable alongside the new password.
    pub async fn redeem_reset(&self, reset_token: &str, new_password: &str) -> Result<(), AuthError> {
        let Some(user) = self.store.find_by_reset_token(reset_token).await? else {
            warn!("password reset attempted with unknown token");
            return Err(AuthError::InvalidToken);
        };
        let hash = hash_blocking(new_password.to_string()).await?;
        self.store
            .update(
                user.id,
                UserUpdate {
                    password_hash: Some(hash),
                    reset_token: Some(None),
                    ..Default::default()
                },
            )
            .await?;
        info!(user_id = %user.id, "password updated via reset token");
        Ok(())
    }
}

/// Argon2 is deliberately CPU-bound; keep it off the async workers.
async fn hash_blocking(plain: String) -> Result<String, AuthError> {
    task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| AuthError::Hashing(e.into()))?
        .map_err(AuthError::Hashing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryUserStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryUserStore::new()))
    }

    #[tokio::test]
    async fn register_twice_fails_the_second_time() {
        let auth = service();
        auth.register("a@x.com", "pw1").await.expect("first register");
        let err = auth.register("a@x.com", "pw2").await.unwrap_err();
        assert!(matches!(err, AuthError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn stored_hash_is_never_the_plaintext() {
        let auth = service();
        let user = auth.register("a@x.com", "pw1").await.expect("register");
        assert_ne!(user.password_hash, "pw1");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn validate_login_unknown_email_is_false_not_an_error() {
        let auth = service();
        let ok = auth
            .validate_login("ghost@x.com", "whatever")
            .await
            .expect("validate_login");
        assert!(!ok);
    }

    #[tokio::test]
    async fn validate_login_checks_the_password() {
        let auth = service();
        auth.register("a@x.com", "pw1").await.expect("register");
        assert!(auth.validate_login("a@x.com", "pw1").await.expect("login"));
        assert!(!auth.validate_login("a@x.com", "wrong").await.expect("login"));
    }

    #[tokio::test]
    async fn create_session_replaces_the_prior_session() {
        let auth = service();
        let user = auth.register("a@x.com", "pw1").await.expect("register");

        let first = auth
            .create_session("a@x.com")
            .await
            .expect("create_session")
            .expect("token");
        let second = auth
            .create_session("a@x.com")
            .await
            .expect("create_session")
            .expect("token");
        assert_ne!(first, second);

        // Only the latest token resolves.
        assert!(auth
            .user_by_session(Some(&first))
            .await
            .expect("lookup")
            .is_none());
        let resolved = auth
            .user_by_session(Some(&second))
            .await
            .expect("lookup")
            .expect("user");
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn create_session_for_unknown_email_is_none() {
        let auth = service();
        let token = auth
            .create_session("ghost@x.com")
            .await
            .expect("create_session");
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn user_by_session_misses_are_quiet() {
        let auth = service();
        assert!(auth.user_by_session(None).await.expect("lookup").is_none());
        assert!(auth
            .user_by_session(Some("no-such-token"))
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn destroy_session_clears_and_is_idempotent() {
        let auth = service();
        let user = auth.register("a@x.com", "pw1").await.expect("register");
        let token = auth
            .create_session("a@x.com")
            .await
            .expect("create_session")
            .expect("token");

        auth.destroy_session(Some(user.id)).await.expect("destroy");
        assert!(auth
            .user_by_session(Some(&token))
            .await
            .expect("lookup")
            .is_none());

        // Destroying again, with no id, or with a stale id is not an error.
        auth.destroy_session(Some(user.id)).await.expect("destroy again");
        auth.destroy_session(None).await.expect("destroy none");
        auth.destroy_session(Some(Uuid::new_v4()))
            .await
            .expect("destroy unknown id");
    }

    #[tokio::test]
    async fn reset_flow_changes_the_password_and_consumes_the_token() {
        let auth = service();
        auth.register("a@x.com", "old-pw").await.expect("register");

        let token = auth
            .issue_reset_token("a@x.com")
            .await
            .expect("issue_reset_token");
        auth.redeem_reset(&token, "new-pw").await.expect("redeem");

        assert!(auth.validate_login("a@x.com", "new-pw").await.expect("login"));
        assert!(!auth.validate_login("a@x.com", "old-pw").await.expect("login"));

        // A consumed token cannot be redeemed a second time.
        let err = auth.redeem_reset(&token, "again").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn issue_reset_token_for_unknown_email_fails() {
        let auth = service();
        let err = auth.issue_reset_token("ghost@x.com").await.unwrap_err();
        assert!(matches!(err, AuthError::UserNotFound));
    }

    #[tokio::test]
    async fn reissuing_replaces_the_outstanding_reset_token() {
        let auth = service();
        auth.register("a@x.com", "pw1").await.expect("register");

        let first = auth.issue_reset_token("a@x.com").await.expect("issue");
        let second = auth.issue_reset_token("a@x.com").await.expect("reissue");
        assert_ne!(first, second);

        let err = auth.redeem_reset(&first, "new-pw").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
        auth.redeem_reset(&second, "new-pw").await.expect("redeem");
    }

    #[tokio::test]
    async fn session_and_reset_states_are_orthogonal() {
        let auth = service();
        let user = auth.register("a@x.com", "pw1").await.expect("register");

        let session = auth
            .create_session("a@x.com")
            .await
            .expect("create_session")
            .expect("token");
        let reset = auth.issue_reset_token("a@x.com").await.expect("issue");

        // Redeeming the reset token leaves the session alive.
        auth.redeem_reset(&reset, "pw2").await.expect("redeem");
        assert!(auth
            .user_by_session(Some(&session))
            .await
            .expect("lookup")
            .is_some());

        // Destroying the session leaves an outstanding reset token alone.
        let reset = auth.issue_reset_token("a@x.com").await.expect("issue");
        auth.destroy_session(Some(user.id)).await.expect("destroy");
        auth.redeem_reset(&reset, "pw3").await.expect("redeem");
    }

    #[tokio::test]
    async fn register_login_session_logout_end_to_end() {
        let auth = service();

        auth.register("a@x.com", "pw1").await.expect("register");
        assert!(auth.validate_login("a@x.com", "pw1").await.expect("login"));
        assert!(!auth.validate_login("a@x.com", "wrong").await.expect("login"));

        let token = auth
            .create_session("a@x.com")
            .await
            .expect("create_session")
            .expect("token");
        assert!(!token.is_empty());

        let user = auth
            .user_by_session(Some(&token))
            .await
            .expect("lookup")
            .expect("user");
        assert_eq!(user.email, "a@x.com");

        auth.destroy_session(Some(user.id)).await.expect("destroy");
        assert!(auth
            .user_by_session(Some(&token))
            .await
            .expect("lookup")
            .is_none());
    }
}
