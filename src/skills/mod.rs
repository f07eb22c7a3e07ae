pub mod dto;
pub mod handlers;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::skill_routes()
}
