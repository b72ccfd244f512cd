//! On-disk credential blob store.
//!
//! The blob's byte format belongs to the cloud client; this store only
//! manages existence, modification time, and deletion. The file is shared
//! with external agents that may edit, delete, or recreate it at any time,
//! so "missing" is an ordinary outcome here, never an error.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use std::{fs, io};

use tracing::warn;

use crate::{AppError, Result};

/// Loads, saves, and deletes the opaque credential blob at a fixed path.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store bound to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The configured credential file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the credential blob.
    ///
    /// Returns `None` when the file is missing or empty. Unexpected read
    /// errors are logged and also reported as absent — a caller that cannot
    /// read the blob is in the same position as one that has none.
    #[must_use]
    pub fn load(&self) -> Option<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => None,
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                warn!(path = %self.path.display(), %err, "failed to read credential file");
                None
            }
        }
    }

    /// Last modification time of the credential file, or `None` if absent.
    #[must_use]
    pub fn modification_time(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok().and_then(|m| m.modified().ok())
    }

    /// Write the credential blob, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the directory or file cannot be written.
    pub fn save(&self, blob: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| io_error(&self.path, &err))?;
            }
        }
        fs::write(&self.path, blob).map_err(|err| io_error(&self.path, &err))
    }

    /// Remove the credential file if present.
    ///
    /// Swallows I/O errors: logout must never fail because cleanup failed.
    pub fn delete(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), %err, "failed to delete credential file");
            }
        }
    }
}

fn io_error(path: &Path, err: &io::Error) -> AppError {
    AppError::Io(format!("credential file {}: {err}", path.display()))
}
