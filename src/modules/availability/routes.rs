use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::app_state::AppState;
use crate::modules::availability::handlers;

pub fn availability_routes() -> Router<AppState> {
    Router::new()
        .route("/bulk", post(handlers::bulk))
        .route("/my", get(handlers::my))
        .route("/:slot_id", delete(handlers::delete_slot))
        .route("/day/:date", put(handlers::replace_day))
        .route("/add", post(handlers::add))
}
