use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::page_routes())
        .merge(handlers::api_routes())
}
