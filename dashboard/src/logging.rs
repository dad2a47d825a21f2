use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};

/// Middleware that logs HTTP requests at INFO level.
///
/// Only the path is logged; query strings and headers may carry tokens.
pub async fn request_logger(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "HTTP request"
    );

    response
}
