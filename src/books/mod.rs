use crate::state::AppState;
use axum::Router;

mod dto;
pub mod filter;
pub mod google;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    handlers::book_routes()
}
