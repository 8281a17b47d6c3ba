use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginRequest, MessageResponse, ProfileResponse, RegisterRequest, ResetTokenRequest,
            ResetTokenResponse, UpdatePasswordRequest,
        },
        extractors::{SessionUser, SESSION_COOKIE},
        service::AuthError,
    },
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/users", post(register))
        .route("/profile", get(profile))
}

pub fn session_routes() -> Router<AppState> {
    Router::new().route("/sessions", post(login).delete(logout))
}

pub fn reset_routes() -> Router<AppState> {
    Router::new().route("/reset_password", post(issue_reset_token).put(update_password))
}

pub async fn index() -> Json<Value> {
    Json(json!({ "message": "Bienvenue" }))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    // Format check only; the email is otherwise an opaque case-sensitive key.
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    match state.auth.register(&payload.email, &payload.password).await {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user created");
            Ok(Json(MessageResponse {
                email: payload.email,
                message: "user created".into(),
            }))
        }
        Err(AuthError::AlreadyRegistered) => {
            warn!(email = %payload.email, "email already registered");
            Err((StatusCode::CONFLICT, "Email already registered".into()))
        }
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<MessageResponse>), (StatusCode, String)> {
    let ok = state
        .auth
        .validate_login(&payload.email, &payload.password)
        .await
        .map_err(internal)?;
    if !ok {
        warn!(email = %payload.email, "login with invalid credentials");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let session_id = state
        .auth
        .create_session(&payload.email)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly")
            .parse()
            .map_err(internal)?,
    );

    info!(email = %payload.email, "user logged in");
    Ok((
        headers,
        Json(MessageResponse {
            email: payload.email,
            message: "logged in".into(),
        }),
    ))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    SessionUser(user): SessionUser,
) -> Result<Redirect, (StatusCode, String)> {
    state
        .auth
        .destroy_session(Some(user.id))
        .await
        .map_err(internal)?;
    info!(user_id = %user.id, "user logged out");
    Ok(Redirect::to("/"))
}

#[instrument(skip(user))]
pub async fn profile(SessionUser(user): SessionUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        id: user.id,
        email: user.email,
    })
}

#[instrument(skip(state, payload))]
pub async fn issue_reset_token(
    State(state): State<AppState>,
    Json(payload): Json<ResetTokenRequest>,
) -> Result<Json<ResetTokenResponse>, (StatusCode, String)> {
    match state.auth.issue_reset_token(&payload.email).await {
        Ok(reset_token) => Ok(Json(ResetTokenResponse {
            email: payload.email,
            reset_token,
        })),
        Err(AuthError::UserNotFound) => {
            warn!(email = %payload.email, "reset token requested for unknown email");
            Err((StatusCode::FORBIDDEN, "Unknown email".into()))
        }
        Err(e) => Err(internal(e)),
    }
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    match state
        .auth
        .redeem_reset(&payload.reset_token, &payload.new_password)
        .await
    {
        Ok(()) => Ok(Json(MessageResponse {
            email: payload.email,
            message: "Password updated".into(),
        })),
        Err(AuthError::InvalidToken) => {
            warn!("password update with invalid reset token");
            Err((StatusCode::FORBIDDEN, "Invalid token".into()))
        }
        Err(e) => Err(internal(e)),
    }
}
