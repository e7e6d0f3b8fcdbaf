use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::app_state::AppState;
use crate::modules::reservations::handlers;

pub fn reservation_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create))
        .route("/my", get(handlers::my))
        .route("/for-me", get(handlers::for_me))
        .route("/:id", get(handlers::by_id))
        .route("/:id/cancel", patch(handlers::cancel))
        .route("/:id/accept", patch(handlers::accept))
        .route("/:id/attended", patch(handlers::attended))
}

/// Enriched view listings plus the roles proxy; mounted at the root since
/// their paths do not share the `/api/reservations` prefix.
pub fn reservation_query_routes() -> Router<AppState> {
    Router::new()
        .route("/api-reservation/by-tutor/:tutor_id", get(handlers::views_by_tutor))
        .route(
            "/api-reservation/by-student/:student_id",
            get(handlers::views_by_student),
        )
        .route("/api-user/my-roles", get(handlers::my_roles))
}
