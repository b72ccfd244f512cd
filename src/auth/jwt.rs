//! HS256 token pairs for the local HTTP gateway.
//!
//! Two token types share one signing key: short-lived access tokens carried
//! on every request, and longer-lived refresh tokens accepted only by the
//! refresh endpoint. The `type` claim keeps them from being swapped.

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::{AppError, Result};

/// `type` claim value on access tokens.
pub const TOKEN_TYPE_ACCESS: &str = "access";
/// `type` claim value on refresh tokens.
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Claims carried by both token types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated username.
    pub sub: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
    /// Token type discriminator, `access` or `refresh`.
    #[serde(rename = "type")]
    pub token_type: String,
}

/// Issues and verifies gateway tokens with a single HS256 secret.
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_minutes: i64,
    refresh_days: i64,
    refresh_threshold_minutes: i64,
}

impl std::fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuth")
            .field("encoding", &"<redacted>")
            .field("decoding", &"<redacted>")
            .field("access_minutes", &self.access_minutes)
            .field("refresh_days", &self.refresh_days)
            .field("refresh_threshold_minutes", &self.refresh_threshold_minutes)
            .finish()
    }
}

impl JwtAuth {
    /// Build from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the signing secret is empty, which
    /// means credential loading was skipped or failed upstream.
    pub fn new(config: &JwtConfig) -> Result<Self> {
        if config.secret.is_empty() {
            return Err(AppError::Config("jwt signing secret is empty".into()));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            access_minutes: config.access_minutes,
            refresh_days: config.refresh_days,
            refresh_threshold_minutes: config.refresh_threshold_minutes,
        })
    }

    /// Issue an access token for `username`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Token` if signing fails.
    pub fn create_access_token(&self, username: &str) -> Result<String> {
        self.sign(
            username,
            ChronoDuration::minutes(self.access_minutes),
            TOKEN_TYPE_ACCESS,
        )
    }

    /// Issue a refresh token for `username`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Token` if signing fails.
    pub fn create_refresh_token(&self, username: &str) -> Result<String> {
        self.sign(
            username,
            ChronoDuration::days(self.refresh_days),
            TOKEN_TYPE_REFRESH,
        )
    }

    fn sign(&self, username: &str, lifetime: ChronoDuration, token_type: &str) -> Result<String> {
        let claims = Claims {
            sub: username.to_owned(),
            exp: (Utc::now() + lifetime).timestamp(),
            token_type: token_type.to_owned(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AppError::Token(format!("token signing failed: {err}")))
    }

    /// Verify a token and check it carries the expected type claim.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Token` with distinct messages for expired tokens,
    /// bad signatures, malformed tokens, and type mismatches.
    pub fn verify(&self, token: &str, expected_type: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => AppError::Token("token expired".into()),
                ErrorKind::InvalidSignature => AppError::Token("token signature invalid".into()),
                _ => AppError::Token(format!("token invalid: {err}")),
            }
        })?;
        if data.claims.token_type != expected_type {
            return Err(AppError::Token(format!(
                "expected {expected_type} token, got {}",
                data.claims.token_type
            )));
        }
        Ok(data.claims)
    }

    /// Whether an access token is close enough to expiry that the client
    /// should refresh it.
    #[must_use]
    pub fn should_refresh(&self, claims: &Claims) -> bool {
        let remaining = claims.exp - Utc::now().timestamp();
        remaining < self.refresh_threshold_minutes * 60
    }
}
