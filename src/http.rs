//! Generic HTTP entry point.
//!
//! Carries no business logic: every request, on any path or method, gets
//! status 444 and an empty body.

use axum::Router;
use axum::http::StatusCode;
use tokio::net::TcpListener;

/// Status returned for every HTTP request.
pub const NO_RESPONSE_STATUS: u16 = 444;

async fn no_response() -> StatusCode {
    StatusCode::from_u16(NO_RESPONSE_STATUS).unwrap_or(StatusCode::BAD_REQUEST)
}

/// Build the fallback router.
pub fn fallback_routes() -> Router {
    Router::new().fallback(no_response)
}

/// Serve the fallback router until the listener fails.
pub async fn serve(listener: TcpListener) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "Fallback HTTP responder started");
    }
    axum::serve(listener, fallback_routes()).await
}
