//! Local HTTP gateway.
//!
//! Exposes the session core over a JWT-protected axum router. Everything
//! under `/mi` and `/devices` requires a valid access token; `/auth/*`
//! issues and refreshes tokens for configured system users.

pub mod routes;
pub mod schemas;
pub mod server;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::AppError;

pub use routes::AppState;
pub use server::serve;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Auth(_) | Self::Token(_) | Self::SessionMissing => StatusCode::UNAUTHORIZED,
            Self::Resolution(_) => StatusCode::BAD_REQUEST,
            Self::Remote(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
