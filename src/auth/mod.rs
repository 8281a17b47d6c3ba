use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod memory;
pub mod password;
pub mod repo;
pub mod service;
pub mod store;
pub mod token;
pub(crate) mod extractors;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::user_routes())
        .merge(handlers::session_routes())
        .merge(handlers::reset_routes())
}
