//! Request logging middleware.

use crate::auth::middleware::AuthenticatedUser;
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{info, warn};

/// Health checks are not logged
const QUIET_PATHS: &[&str] = &["/health"];

/// One line per request: method, path, status, latency, and the caller's id
/// when the request was authenticated. Query strings are left out so
/// credentials never reach the log.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if QUIET_PATHS.contains(&path.as_str()) {
        return next.run(request).await;
    }

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    let user_id = response
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.0);

    if status.is_server_error() {
        warn!(%method, %path, status = status.as_u16(), latency_ms, ?user_id, "Request failed");
    } else {
        info!(%method, %path, status = status.as_u16(), latency_ms, ?user_id, "Request handled");
    }

    response
}
