//! Session/cache orchestration: login, logout, restore, device directory.
//!
//! [`SessionCacheManager`] is the single authority for session mutation.
//! The gateway and the credential-file watcher both route through the same
//! entry points here, serialized by one mutex held across the full network
//! call plus state swap — two logins can never interleave and leave the
//! loser's handle installed.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::remote::{AuthState, DeviceRecord, RemoteAccount, DEVICE_LIST_ENDPOINT};
use crate::session::cache::DeviceDirectoryCache;
use crate::session::store::CredentialStore;
use crate::{AppError, Result};

/// The installed authenticated session. Exactly one is live at a time, or
/// none; replaced wholesale on re-login or file-triggered reload.
struct SessionHandle {
    auth: AuthState,
}

/// Capability to act on the current session, handed out by
/// [`SessionCacheManager::ensure_session`].
///
/// Carries a snapshot of the authenticated state plus the shared cloud
/// client — never a reference into manager-owned state.
pub struct ServiceHandle {
    auth: AuthState,
    remote: Arc<dyn RemoteAccount>,
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("auth", &self.auth)
            .field("remote", &"<dyn RemoteAccount>")
            .finish()
    }
}

impl ServiceHandle {
    /// The authenticated state this capability is bound to.
    #[must_use]
    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    /// Start playback of a URL on the device's media player.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` on transport or decode failure.
    pub async fn play_url(&self, device_id: &str, url: &str) -> Result<Value> {
        let message = serde_json::json!({
            "startaudioid": 1_582_971_365_183_456_177_i64,
            "music": build_music_payload(url).to_string(),
        });
        self.remote
            .ubus_request(&self.auth, device_id, "player_play_music", "mediaplayer", message)
            .await
    }

    /// Issue a playback transport operation: `play`, `pause`, or `stop`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` on transport or decode failure.
    pub async fn playback_operation(&self, device_id: &str, action: &str) -> Result<Value> {
        let message = serde_json::json!({ "action": action, "media": "app_ios" });
        self.remote
            .ubus_request(&self.auth, device_id, "player_play_operation", "mediaplayer", message)
            .await
    }

    /// Query the device's current playback status.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` on transport or decode failure.
    pub async fn play_status(&self, device_id: &str) -> Result<Value> {
        let message = serde_json::json!({ "media": "app_ios" });
        self.remote
            .ubus_request(&self.auth, device_id, "player_get_play_status", "mediaplayer", message)
            .await
    }

    /// Set the device volume (0–100).
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` on transport or decode failure.
    pub async fn set_volume(&self, device_id: &str, volume: u8) -> Result<Value> {
        let message = serde_json::json!({ "volume": volume, "media": "app_ios" });
        self.remote
            .ubus_request(&self.auth, device_id, "player_set_volume", "mediaplayer", message)
            .await
    }

    /// Speak `text` through the device's generic TTS service.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` on transport or decode failure.
    pub async fn text_to_speech(&self, device_id: &str, text: &str) -> Result<Value> {
        let message = serde_json::json!({ "text": text, "save": 0 });
        self.remote
            .ubus_request(&self.auth, device_id, "text_to_speech", "text_to_speech", message)
            .await
    }
}

/// Owns the current session, the device-directory cache, and the mutex
/// guarding all session mutation.
pub struct SessionCacheManager {
    remote: Arc<dyn RemoteAccount>,
    store: Arc<CredentialStore>,
    state: Mutex<Option<SessionHandle>>,
    cache: DeviceDirectoryCache,
}

impl SessionCacheManager {
    /// Create a manager with no session installed.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteAccount>,
        store: Arc<CredentialStore>,
        device_cache_ttl: Duration,
    ) -> Self {
        Self {
            remote,
            store,
            state: Mutex::new(None),
            cache: DeviceDirectoryCache::new(device_cache_ttl),
        }
    }

    /// Authenticate with the cloud and install a fresh session.
    ///
    /// The mutex is held for the full login-and-verify sequence plus the
    /// state swap. The remote login persists a new credential blob as a side
    /// effect; the verification fetch confirms the returned handle is alive.
    /// On any failure nothing is installed and the previous session stands.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Auth` when the cloud rejects the credentials or
    /// the verification fetch fails.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let mut guard = self.state.lock().await;

        let auth = match self.remote.login(username, password).await {
            Ok(auth) => auth,
            Err(AppError::Auth(msg)) => return Err(AppError::Auth(msg)),
            Err(err) => return Err(AppError::Auth(format!("remote login failed: {err}"))),
        };
        self.remote
            .fetch_device_directory(&auth)
            .await
            .map_err(|err| AppError::Auth(format!("login verification failed: {err}")))?;

        *guard = Some(SessionHandle { auth });
        self.cache.invalidate();
        info!("remote account session installed");
        Ok(())
    }

    /// Clear the session, the device cache, and the on-disk credential file.
    ///
    /// Idempotent: logging out with no active session is not an error, and
    /// file cleanup failures are swallowed by the store.
    pub async fn logout(&self) {
        let mut guard = self.state.lock().await;
        *guard = None;
        self.cache.invalidate();
        self.store.delete();
        info!("remote account session cleared");
    }

    /// A capability on the live session.
    ///
    /// Read-only: never attempts an implicit login.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionMissing` when no session is installed.
    pub async fn ensure_session(&self) -> Result<ServiceHandle> {
        let guard = self.state.lock().await;
        guard
            .as_ref()
            .map(|handle| ServiceHandle {
                auth: handle.auth.clone(),
                remote: Arc::clone(&self.remote),
            })
            .ok_or(AppError::SessionMissing)
    }

    /// Materialize a session purely from the on-disk credential blob.
    ///
    /// Verifies the stored credential with a single device-directory request
    /// with automatic re-login disabled — a stale blob must surface as a
    /// failed restore, never trigger a silent blank-credential login. On any
    /// failure the prior session (if any) is left untouched and `false` is
    /// returned; this path never propagates an error.
    pub async fn restore_from_file(&self) -> bool {
        let Some(blob) = self.store.load() else {
            debug!("no credential blob on disk, restore skipped");
            return false;
        };
        let Some(auth) = AuthState::from_blob(&blob) else {
            warn!("credential blob unparseable, restore skipped");
            return false;
        };

        let mut guard = self.state.lock().await;
        match self
            .remote
            .raw_request(&auth, DEVICE_LIST_ENDPOINT, None, false)
            .await
        {
            Ok(body) if body.get("code").and_then(Value::as_i64) == Some(0) => {
                *guard = Some(SessionHandle { auth });
                self.cache.invalidate();
                info!("session restored from credential file");
                true
            }
            Ok(body) => {
                warn!(%body, "credential verification rejected, keeping prior session");
                false
            }
            Err(err) => {
                warn!(%err, "credential verification failed, keeping prior session");
                false
            }
        }
    }

    /// Drop the session without touching the credential file.
    ///
    /// Watcher entry point for out-of-band credential deletion.
    pub async fn clear_session(&self) {
        let mut guard = self.state.lock().await;
        if guard.take().is_some() {
            info!("session cleared after credential file deletion");
        }
        self.cache.invalidate();
    }

    /// The device directory, served from cache while fresh.
    ///
    /// Concurrent callers past the expiry may both fetch (benign duplicate
    /// work); the cache slot is always replaced whole.
    ///
    /// # Errors
    ///
    /// Returns `AppError::SessionMissing` with no session installed, or
    /// `AppError::Remote` if the fetch fails.
    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>> {
        if let Some(devices) = self.cache.get() {
            return Ok(devices);
        }
        let service = self.ensure_session().await?;
        let devices = self.remote.fetch_device_directory(service.auth()).await?;
        self.cache.put(devices.clone());
        Ok(devices)
    }

    /// Resolve a caller-supplied selector to a device identifier.
    ///
    /// Ordered rules, first match wins, case-sensitive exact equality:
    /// 1. empty selector → first device in the directory;
    /// 2. selector contains a hyphen and equals some device id → that id;
    /// 3. all-decimal-digit selector → device whose numeric hardware id
    ///    renders to the same string;
    /// 4. selector equals a device alias or display name → that device's id.
    ///
    /// A non-empty selector that matches nothing fails explicitly; there is
    /// no fallback to an arbitrary device.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Resolution` naming the unmatched selector, or
    /// propagates [`Self::list_devices`] failures.
    pub async fn resolve_device_selector(&self, selector: &str) -> Result<String> {
        let devices = self.list_devices().await?;

        if selector.is_empty() {
            return devices
                .first()
                .map(|d| d.device_id.clone())
                .ok_or_else(|| AppError::Resolution("no devices available".into()));
        }

        if selector.contains('-') && devices.iter().any(|d| d.device_id == selector) {
            return Ok(selector.to_owned());
        }

        if selector.bytes().all(|b| b.is_ascii_digit()) {
            if let Some(device) = devices
                .iter()
                .find(|d| d.miot_did.is_some_and(|did| did.to_string() == selector))
            {
                return Ok(device.device_id.clone());
            }
        }

        if let Some(device) = devices
            .iter()
            .find(|d| d.alias.as_deref() == Some(selector) || d.name.as_deref() == Some(selector))
        {
            return Ok(device.device_id.clone());
        }

        Err(AppError::Resolution(format!(
            "no device matches selector '{selector}'"
        )))
    }
}

/// Payload shape the media player expects for URL playback.
fn build_music_payload(url: &str) -> Value {
    serde_json::json!({
        "payload": {
            "audio_type": "MUSIC",
            "audio_items": [{
                "item_id": {
                    "audio_id": 1_582_971_365_183_456_177_i64,
                    "cp": {
                        "album_id": "-1",
                        "episode_index": 0,
                        "id": 355_454_500,
                        "name": "xiaowei",
                    },
                },
                "stream": { "url": url },
            }],
            "list_params": {
                "listId": "-1",
                "loadmore_offset": 0,
                "origin": "xiaowei",
                "type": "MUSIC",
            },
        },
        "play_behavior": "REPLACE_ALL",
    })
}
