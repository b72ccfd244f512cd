//! Production cloud client for the MiNA-family account/service API.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::session::store::CredentialStore;
use crate::{AppError, Result};

use super::{AuthState, DeviceRecord, RemoteAccount, DEVICE_LIST_ENDPOINT};

/// User-Agent the cloud expects from companion-app clients.
const USER_AGENT: &str =
    "MiHome/6.0.103 (com.xiaomi.mihome; build:6.0.103.1; iOS 14.4.0) MICO/iOSApp/appStore/6.0.103";

/// Login endpoint on the account service.
const LOGIN_ENDPOINT: &str = "/pass/serviceLogin";

/// Service identifier requested at login.
const LOGIN_SID: &str = "micoapi";

/// Reqwest-backed implementation of [`RemoteAccount`].
///
/// Clone-cheap: `reqwest::Client` shares its connection pool internally.
/// Persists the credential blob through the [`CredentialStore`] as a side
/// effect of every successful login.
#[derive(Clone)]
pub struct MinaClient {
    http: Client,
    account_base: String,
    api_base: String,
    store: Arc<CredentialStore>,
}

impl MinaClient {
    /// Create a new client bound to the configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(remote: &RemoteConfig, store: Arc<CredentialStore>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(remote.request_timeout_seconds))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            account_base: remote.account_base_url.clone(),
            api_base: remote.api_base_url.clone(),
            store,
        })
    }

    fn session_cookie(auth: &AuthState) -> String {
        format!(
            "userId={}; serviceToken={}",
            auth.user_id, auth.service_token
        )
    }

    /// Check if a response is successful, surfacing the body on failure.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::Remote(format!(
                "cloud returned {status}: {body}"
            )))
        }
    }

    async fn do_login(&self, username: &str, password: &str) -> Result<AuthState> {
        let url = format!("{}{}", self.account_base, LOGIN_ENDPOINT);
        let response = self
            .http
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("user", username),
                ("password", password),
                ("sid", LOGIN_SID),
            ])
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(AppError::Auth("account credentials rejected".into()));
        }
        let response = Self::check_response(response).await?;
        let body: Value = response.json().await?;

        if body.get("code").and_then(Value::as_i64) != Some(0) {
            let msg = body
                .get("desc")
                .and_then(Value::as_str)
                .unwrap_or("login rejected");
            return Err(AppError::Auth(msg.to_owned()));
        }

        let user_id = match body.get("userId") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(AppError::Remote("login response missing userId".into())),
        };
        let service_token = body
            .get("serviceToken")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Remote("login response missing serviceToken".into()))?
            .to_owned();

        Ok(AuthState {
            user_id,
            service_token,
        })
    }

    async fn do_raw_request(
        &self,
        auth: &AuthState,
        endpoint: &str,
        payload: Option<&Value>,
    ) -> Result<(StatusCode, Option<Value>)> {
        let url = format!("{}{}", self.api_base, endpoint);
        let builder = match payload {
            Some(body) => self.http.post(&url).json(body),
            None => self.http.get(&url),
        };
        let response = builder
            .header(header::COOKIE, Self::session_cookie(auth))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: Value = response.json().await?;
            Ok((status, Some(body)))
        } else {
            Ok((status, None))
        }
    }
}

impl RemoteAccount for MinaClient {
    fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Pin<Box<dyn Future<Output = Result<AuthState>> + Send + '_>> {
        let username = username.to_owned();
        let password = password.to_owned();
        Box::pin(async move {
            let auth = self.do_login(&username, &password).await?;
            // Persisting the blob is part of a successful login; a write
            // failure invalidates the login rather than leaving the file
            // out of sync with the installed session.
            self.store.save(&auth.to_blob())?;
            debug!(user_id = %auth.user_id, "remote login succeeded, credential blob persisted");
            Ok(auth)
        })
    }

    fn fetch_device_directory(
        &self,
        auth: &AuthState,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DeviceRecord>>> + Send + '_>> {
        let auth = auth.clone();
        Box::pin(async move {
            let body = self
                .raw_request(&auth, DEVICE_LIST_ENDPOINT, None, false)
                .await?;
            if body.get("code").and_then(Value::as_i64) != Some(0) {
                return Err(AppError::Remote(format!(
                    "device directory fetch rejected: {body}"
                )));
            }
            let data = body.get("data").cloned().unwrap_or(Value::Array(vec![]));
            let devices: Vec<DeviceRecord> = serde_json::from_value(data)
                .map_err(|err| AppError::Remote(format!("device directory decode: {err}")))?;
            debug!(count = devices.len(), "device directory fetched");
            Ok(devices)
        })
    }

    fn raw_request(
        &self,
        auth: &AuthState,
        endpoint: &str,
        payload: Option<Value>,
        auto_relogin: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>> {
        let auth = auth.clone();
        let endpoint = endpoint.to_owned();
        Box::pin(async move {
            let (status, body) = self
                .do_raw_request(&auth, &endpoint, payload.as_ref())
                .await?;
            if let Some(body) = body {
                return Ok(body);
            }

            // A 401 with auto_relogin enabled retries once with whatever
            // credential is currently on disk; verification paths pass
            // `false` so a stale token surfaces instead of masking itself.
            if status == StatusCode::UNAUTHORIZED && auto_relogin {
                if let Some(fresh) = self.store.load().and_then(|b| AuthState::from_blob(&b)) {
                    if fresh != auth {
                        warn!(endpoint = %endpoint, "retrying request with refreshed on-disk credential");
                        let (retry_status, retry_body) =
                            self.do_raw_request(&fresh, &endpoint, payload.as_ref()).await?;
                        if let Some(body) = retry_body {
                            return Ok(body);
                        }
                        return Err(AppError::Remote(format!(
                            "cloud returned {retry_status} after credential refresh"
                        )));
                    }
                }
            }

            Err(AppError::Remote(format!("cloud returned {status}")))
        })
    }

    fn ubus_request(
        &self,
        auth: &AuthState,
        device_id: &str,
        method: &str,
        path: &str,
        message: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>> {
        let payload = serde_json::json!({
            "deviceId": device_id,
            "message": message.to_string(),
            "method": method,
            "path": path,
        });
        self.raw_request(auth, "/remote/ubus", Some(payload), false)
    }
}
