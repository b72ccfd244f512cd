//! Session core: credential persistence, device-directory cache, session
//! lifecycle, and the credential-file watcher.

pub mod cache;
pub mod manager;
pub mod store;
pub mod watcher;

pub use cache::DeviceDirectoryCache;
pub use manager::{ServiceHandle, SessionCacheManager};
pub use store::CredentialStore;
pub use watcher::CredentialFileWatcher;
