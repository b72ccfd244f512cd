//! Single-slot TTL cache for the device directory.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::remote::DeviceRecord;

struct CacheSlot {
    devices: Vec<DeviceRecord>,
    expires_at: Instant,
}

/// Holds the last fetched device list until a fixed expiry.
///
/// `put` replaces the slot in one step under an internal lock, so concurrent
/// readers may observe a duplicate fetch across an expiry boundary but never
/// a torn sequence.
pub struct DeviceDirectoryCache {
    ttl: Duration,
    slot: Mutex<Option<CacheSlot>>,
}

impl DeviceDirectoryCache {
    /// Create an empty cache with the given time-to-live.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// The cached device list, or `None` when empty or expired.
    #[must_use]
    pub fn get(&self) -> Option<Vec<DeviceRecord>> {
        let guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|slot| Instant::now() < slot.expires_at)
            .map(|slot| slot.devices.clone())
    }

    /// Store a freshly fetched device list with `expiry = now + TTL`.
    pub fn put(&self, devices: Vec<DeviceRecord>) {
        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(CacheSlot {
            devices,
            expires_at: Instant::now() + self.ttl,
        });
    }

    /// Clear unconditionally.
    ///
    /// Called on login, logout, and every watcher-triggered session change —
    /// a stale device list must never survive a credential change.
    pub fn invalidate(&self) {
        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}
