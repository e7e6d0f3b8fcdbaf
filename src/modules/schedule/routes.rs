use axum::{routing::get, Router};

use crate::app_state::AppState;
use crate::modules::schedule::handlers;

pub fn schedule_routes() -> Router<AppState> {
    Router::new().route("/tutor/:tutor_id", get(handlers::week))
}
