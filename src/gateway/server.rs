//! Gateway HTTP server bootstrap.

use axum::extract::Request;
use axum::http::header::{HeaderValue, CACHE_CONTROL};
use axum::middleware::{self, Next};
use axum::response::Response;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::gateway::routes::{self, AppState};
use crate::{AppError, Result};

/// Stamp every response with `Cache-Control: no-store`.
///
/// Token pairs and session status must never land in an intermediary cache.
async fn no_store(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Bind and serve the gateway until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Config` if the listener cannot bind, or
/// `AppError::Io` if the server fails while running.
pub async fn serve(state: AppState, ct: CancellationToken) -> Result<()> {
    let bind = format!("{}:{}", state.config.http_host, state.config.http_port);
    let router = routes::router(state).layer(middleware::from_fn(no_store));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|err| AppError::Config(format!("failed to bind gateway on {bind}: {err}")))?;

    info!(%bind, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Io(format!("gateway server error: {err}")))?;

    info!("gateway shut down");
    Ok(())
}
