//! Remote account/service collaborator.
//!
//! The [`RemoteAccount`] trait decouples the session core from the cloud
//! protocol: the production implementation is [`MinaClient`], tests substitute
//! a mock. All session-affecting traffic routes through this trait.

pub mod client;
pub mod device;

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

pub use client::MinaClient;
pub use device::DeviceRecord;

use crate::Result;

/// Endpoint used to verify a credential without side effects.
///
/// Fetching the device directory is the cheapest authenticated call the cloud
/// exposes, so both restore verification and the directory fetch use it.
pub const DEVICE_LIST_ENDPOINT: &str = "/admin/v2/device_list?master=0";

/// Authenticated state extracted from a successful login or a credential blob.
///
/// This is the only layer that interprets the credential file; the session
/// core treats the blob as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthState {
    /// Cloud account user identifier.
    pub user_id: String,
    /// Bearer token for the device/service API.
    pub service_token: String,
}

impl AuthState {
    /// Parse an `AuthState` from a credential blob.
    ///
    /// Returns `None` when the blob is not valid JSON or lacks the expected
    /// fields — callers treat that the same as an absent file.
    #[must_use]
    pub fn from_blob(blob: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(blob).ok()?;
        let user_id = value.get("user_id")?.as_str()?.to_owned();
        let service_token = value.get("service_token")?.as_str()?.to_owned();
        if user_id.is_empty() || service_token.is_empty() {
            return None;
        }
        Some(Self {
            user_id,
            service_token,
        })
    }

    /// Serialize this state into the credential blob format.
    #[must_use]
    pub fn to_blob(&self) -> Vec<u8> {
        serde_json::json!({
            "user_id": self.user_id,
            "service_token": self.service_token,
        })
        .to_string()
        .into_bytes()
    }
}

/// Cloud account/service operations consumed by the session core.
///
/// Methods return boxed futures so the trait stays object-safe; the session
/// manager holds an `Arc<dyn RemoteAccount>`.
pub trait RemoteAccount: Send + Sync {
    /// Authenticate with username/password and persist the credential blob.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Auth`](crate::AppError::Auth) when the cloud
    /// rejects the credentials and [`AppError::Remote`](crate::AppError::Remote)
    /// for transport or decode failures.
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Pin<Box<dyn Future<Output = Result<AuthState>> + Send + '_>>;

    /// Fetch the account's device directory.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Remote`](crate::AppError::Remote) on transport,
    /// non-success response, or decode failure.
    fn fetch_device_directory(
        &self,
        auth: &AuthState,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DeviceRecord>>> + Send + '_>>;

    /// Issue a raw authenticated request against the device/service API.
    ///
    /// With `auto_relogin` disabled an authentication failure surfaces as an
    /// error instead of silently re-authenticating; credential verification
    /// always passes `false`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Remote`](crate::AppError::Remote) on transport,
    /// non-success response, or decode failure.
    fn raw_request(
        &self,
        auth: &AuthState,
        endpoint: &str,
        payload: Option<Value>,
        auto_relogin: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>>;

    /// Dispatch a ubus command to one device.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Remote`](crate::AppError::Remote) on transport,
    /// non-success response, or decode failure.
    fn ubus_request(
        &self,
        auth: &AuthState,
        device_id: &str,
        method: &str,
        path: &str,
        message: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>>;
}
