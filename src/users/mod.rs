use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod mem;
pub mod model;
pub mod service;
pub mod store;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
