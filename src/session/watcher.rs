//! Polling watcher for the credential file.
//!
//! External agents may rewrite or delete the credential blob at any time.
//! The watcher polls the file's modification time and drives the session
//! manager: a changed file triggers a restore attempt, a deleted file clears
//! the session. Event-based notification is deliberately not used here; the
//! file lives on paths (network mounts, bind mounts) where mtime polling is
//! the only portable signal.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::session::manager::SessionCacheManager;
use crate::session::store::CredentialStore;

/// Bound on how long `stop` waits for the poll task to exit.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

struct WatcherState {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Watches the credential file and keeps the session in sync with it.
pub struct CredentialFileWatcher {
    manager: Arc<SessionCacheManager>,
    store: Arc<CredentialStore>,
    poll_interval: Duration,
    inner: Mutex<Option<WatcherState>>,
}

impl CredentialFileWatcher {
    /// Create a stopped watcher.
    #[must_use]
    pub fn new(
        manager: Arc<SessionCacheManager>,
        store: Arc<CredentialStore>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            manager,
            store,
            poll_interval,
            inner: Mutex::new(None),
        }
    }

    /// Start the poll loop. No-op if already running.
    ///
    /// The watermark is captured before the task spawns, so a file state
    /// already handled by startup restore is not re-processed on the first
    /// tick.
    pub fn start(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.as_ref().is_some_and(|s| !s.handle.is_finished()) {
            debug!("credential watcher already running");
            return;
        }

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let manager = Arc::clone(&self.manager);
        let store = Arc::clone(&self.store);
        let interval = self.poll_interval;
        let watermark = store.modification_time();

        let handle = tokio::spawn(
            poll_loop(manager, store, interval, watermark, task_cancel)
                .instrument(info_span!("credential_watcher")),
        );
        *guard = Some(WatcherState { cancel, handle });
        info!(interval_secs = interval.as_secs(), "credential watcher started");
    }

    /// Stop the poll loop and wait for it to exit, bounded by a short timeout.
    ///
    /// Idempotent: stopping a stopped watcher does nothing.
    pub async fn stop(&self) {
        let state = {
            let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            guard.take()
        };
        let Some(state) = state else {
            return;
        };
        state.cancel.cancel();
        match tokio::time::timeout(STOP_TIMEOUT, state.handle).await {
            Ok(Ok(())) => info!("credential watcher stopped"),
            Ok(Err(err)) => warn!(%err, "credential watcher task panicked"),
            Err(_) => warn!("credential watcher did not stop within timeout"),
        }
    }
}

async fn poll_loop(
    manager: Arc<SessionCacheManager>,
    store: Arc<CredentialStore>,
    interval: Duration,
    mut watermark: Option<SystemTime>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(interval) => {}
        }

        let mtime = store.modification_time();
        if mtime == watermark {
            continue;
        }

        match mtime {
            None => {
                info!("credential file deleted, clearing session");
                manager.clear_session().await;
            }
            Some(_) => {
                info!("credential file changed, attempting restore");
                if manager.restore_from_file().await {
                    info!("session reloaded from changed credential file");
                } else {
                    warn!("changed credential file did not yield a usable session");
                }
            }
        }
        // Advance regardless of outcome so an unusable file is not retried
        // every tick until it changes again.
        watermark = mtime;
    }
}
