//! Request and response bodies for the gateway routes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct SystemLoginRequest {
    /// Configured system username.
    pub username: String,
    /// Configured system password.
    pub password: String,
}

/// Token pair returned by `/auth/login` and `/auth/refresh`.
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    /// Short-lived bearer token.
    pub access_token: String,
    /// Long-lived token accepted only by `/auth/refresh`.
    pub refresh_token: String,
    /// Always `bearer`.
    pub token_type: &'static str,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// A valid refresh token.
    pub refresh_token: String,
}

/// Envelope used by the action routes.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Optional structured payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    /// A successful response with no payload.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// A successful response carrying a payload.
    #[must_use]
    pub fn with_data(message: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// Body of `POST /mi/account/login`.
#[derive(Debug, Deserialize)]
pub struct RemoteLoginRequest {
    /// Remote account username.
    pub username: String,
    /// Remote account password.
    pub password: String,
}

/// Body of `POST /mi/device/playback/play-url`.
#[derive(Debug, Deserialize)]
pub struct PlayUrlRequest {
    /// Device selector; empty means the first device.
    #[serde(default)]
    pub device: String,
    /// Audio URL to stream.
    pub url: String,
}

/// Body of the playback transport routes (`play`, `pause`, `stop`).
#[derive(Debug, Deserialize)]
pub struct PlayControlRequest {
    /// Device selector; empty means the first device.
    #[serde(default)]
    pub device: String,
}

/// Body of `POST /mi/device/volume`.
#[derive(Debug, Deserialize)]
pub struct VolumeRequest {
    /// Device selector; empty means the first device.
    #[serde(default)]
    pub device: String,
    /// Target volume, 0 to 100.
    pub volume: u8,
}

/// Body of `POST /mi/device/tts`.
#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    /// Device selector; empty means the first device.
    #[serde(default)]
    pub device: String,
    /// Text to speak.
    pub text: String,
}

/// Query parameters of the selector-driven GET routes.
#[derive(Debug, Deserialize)]
pub struct SelectorQuery {
    /// Device selector; empty means the first device.
    #[serde(default)]
    pub device: String,
}
