use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for requesting a password-reset token.
#[derive(Debug, Deserialize)]
pub struct ResetTokenRequest {
    pub email: String,
}

/// Request body for redeeming a reset token. The email rides along for
/// wire compatibility; redemption keys on the token alone.
#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub email: String,
    pub reset_token: String,
    pub new_password: String,
}

/// Generic confirmation payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub email: String,
    pub message: String,
}

/// Response carrying a freshly issued reset token.
#[derive(Debug, Serialize)]
pub struct ResetTokenResponse {
    pub email: String,
    pub reset_token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
}
