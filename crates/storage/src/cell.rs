// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic, durable storage of a single value.
//!
//! Writes go to a temporary file in the same directory, are flushed to
//! stable storage, then atomically renamed over the target. A crash at any
//! point leaves either the old value or the new value on disk, never a
//! partial write. The on-disk envelope carries a schema version; a mismatch
//! at open time is fatal.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Current cell envelope schema version
pub const CURRENT_CELL_VERSION: u32 = 1;

/// Errors that can occur in cell operations
#[derive(Debug, Error)]
pub enum CellError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("incompatible state version {found} in {path} (expected {expected})")]
    Incompatible { path: PathBuf, found: u32, expected: u32 },
}

/// On-disk envelope, serialize side. Borrows the value to avoid a clone.
#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    /// Schema version for migrations
    #[serde(rename = "v")]
    version: u32,
    /// When this value was persisted
    saved_at: DateTime<Utc>,
    value: &'a T,
}

/// Version probe read before committing to the full deserialization, so a
/// layout change surfaces as a version mismatch rather than a parse error.
#[derive(Deserialize)]
struct VersionProbe {
    #[serde(rename = "v")]
    version: u32,
}

#[derive(Deserialize)]
struct Envelope<T> {
    value: T,
}

/// A single durable value with atomic replacement.
///
/// `get` returns the last successfully set value; `set` is all-or-nothing.
/// Thread-safe: writers are serialized, readers see a consistent snapshot.
#[derive(Debug)]
pub struct PersistentCell<T> {
    path: PathBuf,
    value: Mutex<T>,
}

impl<T: Serialize + DeserializeOwned + Clone> PersistentCell<T> {
    /// Open the cell at `path`, loading a previously persisted value if one
    /// exists, otherwise starting from `initial`.
    ///
    /// A leftover temporary file from an interrupted write is discarded.
    /// Fails with [`CellError::Incompatible`] if the on-disk envelope has a
    /// different schema version.
    pub fn open(path: impl Into<PathBuf>, initial: T) -> Result<Self, CellError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = tmp_path(&path);
        if tmp.exists() {
            warn!(path = %tmp.display(), "discarding temp file from interrupted write");
            fs::remove_file(&tmp)?;
        }

        let value = if path.exists() {
            let data = fs::read(&path)?;
            let probe: VersionProbe = serde_json::from_slice(&data)?;
            if probe.version != CURRENT_CELL_VERSION {
                return Err(CellError::Incompatible {
                    path,
                    found: probe.version,
                    expected: CURRENT_CELL_VERSION,
                });
            }
            let envelope: Envelope<T> = serde_json::from_slice(&data)?;
            debug!(path = %path.display(), "loaded persisted value");
            envelope.value
        } else {
            initial
        };

        Ok(Self { path, value: Mutex::new(value) })
    }

    /// The last successfully set value (or the initial value).
    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    /// Atomically replace the stored value.
    ///
    /// After this returns, `get` observes the new value and a process crash
    /// preserves it. On error the previous value remains observable in
    /// memory and on disk.
    pub fn set(&self, value: T) -> Result<(), CellError> {
        let mut guard = self.value.lock();

        let envelope =
            EnvelopeRef { version: CURRENT_CELL_VERSION, saved_at: Utc::now(), value: &value };
        let data = serde_json::to_vec_pretty(&envelope)?;

        let tmp = tmp_path(&self.path);
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&data)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        // Make the rename itself durable.
        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        *guard = value;
        Ok(())
    }

    /// Location of the persisted value.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    path.with_extension("tmp")
}

#[cfg(test)]
#[path = "cell_tests.rs"]
mod tests;
