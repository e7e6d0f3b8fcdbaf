use axum::{middleware, routing::get, Json, Router};
use serde_json::json;
use time::format_description::well_known::Rfc3339;

use crate::{
    app_state::AppState,
    middleware::tracing::request_tracing_middleware,
    modules::availability::routes::availability_routes,
    modules::reservations::routes::{reservation_query_routes, reservation_routes},
    modules::schedule::routes::schedule_routes,
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(health_check))
        .nest("/api/availability", availability_routes())
        .nest("/api/reservations", reservation_routes())
        .nest("/api/schedule", schedule_routes())
        .merge(reservation_query_routes())
        .layer(middleware::from_fn(request_tracing_middleware))
        .with_state(state)
}

async fn hello() -> &'static str {
    "Tutoring backend says hello!\n"
}

async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let db_result = sqlx::query("SELECT 1").execute(&state.db).await;

    let db_status = match db_result {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::info!("Database health check failed: {}", e);
            "unhealthy"
        }
    };

    let timestamp = time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();

    Json(json!({
        "status": "ok",
        "timestamp": timestamp,
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status
        }
    }))
}
