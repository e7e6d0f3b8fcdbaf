use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};

/// Request tracing middleware: wraps each request in a span with a fresh
/// request id and logs the outcome with latency.
pub async fn request_tracing_middleware(
    matched_path: MatchedPath,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let route = matched_path.as_str().to_string();
    let start_time = Instant::now();

    let span = info_span!(
        "http_request",
        method = %method,
        route = %route,
        request_id = %uuid::Uuid::now_v7(),
    );

    let response = next.run(request).instrument(span).await;

    let status_code = response.status().as_u16();
    let latency_ms = start_time.elapsed().as_millis();

    if status_code >= 500 {
        error!(%method, %route, status_code, latency_ms, "request failed");
    } else {
        info!(%method, %route, status_code, latency_ms, "request completed");
    }

    response
}
