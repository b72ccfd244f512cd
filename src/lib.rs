#![forbid(unsafe_code)]

//! `mina-bridge` — local HTTP gateway over a cached remote smart-speaker
//! account session.
//!
//! The session core ([`session::SessionCacheManager`]) owns one optional
//! authenticated session, a TTL device-directory cache, and a polling watcher
//! that keeps the session in sync with an externally shared credential file.
//! The gateway exposes the core over a JWT-protected axum router.

pub mod auth;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod remote;
pub mod session;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
