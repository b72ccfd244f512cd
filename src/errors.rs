//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Explicit remote-account login rejected by the cloud service.
    Auth(String),
    /// An operation requiring a live session was invoked with none installed.
    SessionMissing,
    /// A device selector matched no device in the directory.
    Resolution(String),
    /// System JWT issuance or verification failure.
    Token(String),
    /// Remote transport, non-success response, or decode failure.
    Remote(String),
    /// File-system or I/O operation failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Auth(msg) => write!(f, "auth: {msg}"),
            Self::SessionMissing => {
                write!(f, "session missing: no remote account session installed")
            }
            Self::Resolution(msg) => write!(f, "resolution: {msg}"),
            Self::Token(msg) => write!(f, "token: {msg}"),
            Self::Remote(msg) => write!(f, "remote: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote(err.to_string())
    }
}
