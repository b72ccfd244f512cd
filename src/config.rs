//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name under which the JWT signing secret is stored.
const KEYCHAIN_SERVICE: &str = "mina-bridge";

/// Remote cloud API endpoints and timeouts.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RemoteConfig {
    /// Base URL of the account/login service.
    #[serde(default = "default_account_base_url")]
    pub account_base_url: String,
    /// Base URL of the device/service API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            account_base_url: default_account_base_url(),
            api_base_url: default_api_base_url(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

fn default_account_base_url() -> String {
    "https://account.xiaomi.com".into()
}

fn default_api_base_url() -> String {
    "https://api2.mina.mi.com".into()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

/// System JWT parameters.
///
/// The signing secret is loaded at runtime via OS keychain or the
/// `MINA_BRIDGE_JWT_SECRET` environment variable, never from the TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct JwtConfig {
    /// Access-token lifetime in minutes.
    #[serde(default = "default_access_minutes")]
    pub access_minutes: i64,
    /// Refresh-token lifetime in days.
    #[serde(default = "default_refresh_days")]
    pub refresh_days: i64,
    /// Remaining lifetime below which a refresh is advised, in minutes.
    #[serde(default = "default_refresh_threshold_minutes")]
    pub refresh_threshold_minutes: i64,
    /// Signing secret (populated at runtime).
    #[serde(skip)]
    pub secret: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_minutes: default_access_minutes(),
            refresh_days: default_refresh_days(),
            refresh_threshold_minutes: default_refresh_threshold_minutes(),
            secret: String::new(),
        }
    }
}

fn default_access_minutes() -> i64 {
    60
}

fn default_refresh_days() -> i64 {
    7
}

fn default_refresh_threshold_minutes() -> i64 {
    10
}

/// A system user allowed to obtain gateway tokens.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SystemUser {
    /// Login name.
    pub username: String,
    /// Shared-secret password.
    pub password: String,
}

fn default_http_host() -> String {
    "127.0.0.1".into()
}

fn default_http_port() -> u16 {
    8090
}

fn default_device_cache_ttl_seconds() -> u64 {
    30
}

fn default_watcher_poll_interval_seconds() -> u64 {
    2
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Path of the opaque remote-account credential file.
    pub credential_file: PathBuf,
    /// Bind host for the HTTP gateway.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    /// Bind port for the HTTP gateway.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Device-directory cache time-to-live in seconds.
    #[serde(default = "default_device_cache_ttl_seconds")]
    pub device_cache_ttl_seconds: u64,
    /// Credential-file watcher poll interval in seconds.
    #[serde(default = "default_watcher_poll_interval_seconds")]
    pub watcher_poll_interval_seconds: u64,
    /// Remote cloud endpoints.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// System JWT parameters.
    #[serde(default)]
    pub jwt: JwtConfig,
    /// System users allowed to log in to the gateway.
    #[serde(default, rename = "system_user")]
    pub system_users: Vec<SystemUser>,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the JWT signing secret from OS keychain with env-var fallback.
    ///
    /// Tries the `mina-bridge` keyring service first, then falls back to the
    /// `MINA_BRIDGE_JWT_SECRET` environment variable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if neither source provides a secret.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.jwt.secret = load_credential("jwt_secret", "MINA_BRIDGE_JWT_SECRET").await?;
        Ok(())
    }

    /// Device-directory cache TTL as a [`Duration`].
    #[must_use]
    pub fn device_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.device_cache_ttl_seconds)
    }

    /// Credential-file watcher poll interval as a [`Duration`].
    #[must_use]
    pub fn watcher_poll_interval(&self) -> Duration {
        Duration::from_secs(self.watcher_poll_interval_seconds)
    }

    /// Validate a system user's credentials against the configured list.
    #[must_use]
    pub fn authenticate_system_user(&self, username: &str, password: &str) -> bool {
        self.system_users
            .iter()
            .any(|u| u.username == username && u.password == password)
    }

    fn validate(&self) -> Result<()> {
        if self.credential_file.as_os_str().is_empty() {
            return Err(AppError::Config("credential_file must not be empty".into()));
        }
        if self.device_cache_ttl_seconds == 0 {
            return Err(AppError::Config(
                "device_cache_ttl_seconds must be greater than zero".into(),
            ));
        }
        if self.watcher_poll_interval_seconds == 0 {
            return Err(AppError::Config(
                "watcher_poll_interval_seconds must be greater than zero".into(),
            ));
        }
        if self.jwt.access_minutes <= 0 || self.jwt.refresh_days <= 0 {
            return Err(AppError::Config(
                "jwt lifetimes must be greater than zero".into(),
            ));
        }
        if self.system_users.is_empty() {
            warn!("no [[system_user]] entries configured; gateway logins will always fail");
        }
        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // Keychain access is synchronous I/O, so run it off the async executor.
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYCHAIN_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
