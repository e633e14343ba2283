pub mod dto;
pub mod forms;
pub mod handlers;
pub mod password;
pub mod redirect;
pub mod session;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
