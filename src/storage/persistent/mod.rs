//! Persistent storage backend.
//!
//! Durable, crash-safe storage with:
//! - Write-Ahead Logging (WAL) for crash recovery
//! - File locking for single-process ownership of a data directory
//! - CRC32 checksums for corruption detection
//! - Snapshot compaction to bound replay time
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     PersistentStores                         │
//! │   profiles / readings / notifications (in-memory indexes)    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐                    │
//! │  │ WriteAheadLog   │  │ Snapshot        │                    │
//! │  │ (append-only)   │  │ (compaction)    │                    │
//! │  └────────┬────────┘  └────────┬────────┘                    │
//! │           └──────────┬─────────┘                             │
//! │                      ↓                                       │
//! │           ┌─────────────────────┐                            │
//! │           │   FileLock (flock)  │                            │
//! │           └─────────────────────┘                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod codec;
mod file_lock;
mod snapshot;
mod stores;
mod wal;

pub use file_lock::FileLock;
pub use snapshot::Snapshot;
pub use stores::{
    CompactionResult, PersistentNotificationStore, PersistentProfileStore, PersistentReadingLog,
    PersistentStores,
};
pub use wal::{WalEntry, WalEntryKind, WriteAheadLog};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult, ValidationError};

/// Configuration for persistent storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentConfig {
    /// Whether to fsync after every write (slower but safer).
    pub sync_on_write: bool,
    /// WAL size in bytes above which `compact_if_needed` compacts.
    pub max_wal_size: u64,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            sync_on_write: true,
            max_wal_size: 16 * 1024 * 1024,
        }
    }
}

impl PersistentConfig {
    const MIN_WAL_SIZE: u64 = 4 * 1024;

    /// Validates the configuration.
    pub fn validate(self) -> MonitorResult<Self> {
        if self.max_wal_size < Self::MIN_WAL_SIZE {
            return Err(MonitorError::Validation(ValidationError::InvalidConfig {
                reason: format!(
                    "max_wal_size must be at least {} bytes (got {})",
                    Self::MIN_WAL_SIZE,
                    self.max_wal_size
                ),
            }));
        }
        Ok(self)
    }
}

/// Open or create a persistent data directory.
///
/// # Errors
/// - If the directory cannot be created or accessed
/// - If another process holds the lock
/// - If the snapshot or WAL is corrupted beyond a torn tail
///
/// # Example
/// ```rust,ignore
/// use std::sync::Arc;
/// use plantwatch::storage::persistent::open_database;
///
/// let stores = open_database("./garden.plantwatch", None)?;
/// let monitor = PlantMonitor::new(
///     stores.profiles.clone(),
///     stores.readings.clone(),
///     stores.notifications.clone(),
///     MonitorConfig::default(),
/// )?;
/// ```
pub fn open_database(path: impl AsRef<Path>, config: Option<PersistentConfig>) -> MonitorResult<PersistentStores> {
    let cfg = config.unwrap_or_default().validate()?;
    PersistentStores::open(path.as_ref(), cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_tiny_wal() {
        let cfg = PersistentConfig {
            max_wal_size: 10,
            ..PersistentConfig::default()
        };
        assert!(cfg.validate().unwrap_err().is_validation());
    }
}
