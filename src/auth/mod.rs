use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;

pub use extractors::{AdminUser, AuthUser, AUTH_TOKEN_HEADER};
pub use repo_types::Role;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
