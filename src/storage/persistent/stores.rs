//! Persistent store implementations.
//!
//! Each store keeps the same in-memory index the in-memory backend uses. A
//! write validates against the index, appends to the shared WAL and only then
//! applies to the index, all under the index write lock, so the log never
//! holds an entry the index would have rejected.
//!
//! A reading and the notifications it fired share one WAL entry, so a crash
//! can never leave a triggering reading without its notifications.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{ExecutionError, MonitorError, MonitorResult};
use crate::notification::{Notification, NotificationId};
use crate::profile::{PlantId, PlantProfile};
use crate::reading::{Reading, ReadingId};
use crate::storage::index::{NotificationIndex, ProfileIndex, ReadingIndex};
use crate::storage::traits::{NotificationStore, ProfileStore, ReadingLog, StorageError};

use super::codec::HEADER_LEN;
use super::file_lock::FileLock;
use super::snapshot::Snapshot;
use super::wal::{WalEntry, WalEntryKind, WriteAheadLog};
use super::PersistentConfig;

/// Name of the write-ahead log inside the data directory.
pub const WAL_FILE: &str = "plantwatch.wal";

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

fn wal_err(e: &std::io::Error) -> StorageError {
    StorageError::BackendError(format!("WAL write failed: {e}"))
}

fn open_err(context: &str, e: impl std::fmt::Display) -> MonitorError {
    MonitorError::Execution(ExecutionError::Persistence {
        message: format!("{context}: {e}"),
    })
}

/// The log plus the directory lock. Shared by every store so the lock lives
/// as long as any store handle does.
#[derive(Debug)]
struct Journal {
    wal: WriteAheadLog,
    _lock: FileLock,
}

impl Journal {
    fn append(&self, kind: WalEntryKind) -> Result<u64, StorageError> {
        self.wal.append(kind).map_err(|e| wal_err(&e))
    }
}

/// All persistent stores over one data directory.
///
/// The store handles are `Arc`s so they can be handed to a
/// [`crate::monitor::PlantMonitor`] while this value keeps compaction access.
#[derive(Debug)]
pub struct PersistentStores {
    /// The data directory.
    pub dir: PathBuf,
    journal: Arc<Journal>,
    config: PersistentConfig,
    /// Plant profiles.
    pub profiles: Arc<PersistentProfileStore>,
    /// Reading log.
    pub readings: Arc<PersistentReadingLog>,
    /// Notifications.
    pub notifications: Arc<PersistentNotificationStore>,
}

impl PersistentStores {
    /// Opens or creates the stores in `dir`, loading the snapshot and
    /// replaying the log written after it.
    pub fn open(dir: &Path, config: PersistentConfig) -> MonitorResult<Self> {
        fs::create_dir_all(dir).map_err(|e| open_err("failed to create data directory", e))?;
        let lock = FileLock::acquire(dir).map_err(|e| open_err("failed to acquire lock", e))?;

        let snapshot = Snapshot::load(dir)
            .map_err(|e| open_err("failed to load snapshot", e))?
            .unwrap_or_default();
        let (wal, entries) = WriteAheadLog::open(&dir.join(WAL_FILE), config.sync_on_write, snapshot.up_to_sequence)
            .map_err(|e| open_err("failed to open WAL", e))?;

        let journal = Arc::new(Journal { wal, _lock: lock });
        let base = snapshot.up_to_sequence;
        let mut state = RecoveredState::from_snapshot(snapshot)?;

        let mut replayed = 0usize;
        for entry in entries.into_iter().filter(|e| e.sequence > base) {
            state.apply(entry)?;
            replayed += 1;
        }
        if replayed > 0 {
            info!(dir = %dir.display(), entries = replayed, "replayed write-ahead log");
        }

        let notifications = Arc::new(PersistentNotificationStore {
            journal: journal.clone(),
            index: RwLock::new(state.notifications),
        });
        Ok(Self {
            dir: dir.to_path_buf(),
            profiles: Arc::new(PersistentProfileStore {
                journal: journal.clone(),
                index: RwLock::new(state.profiles),
            }),
            readings: Arc::new(PersistentReadingLog {
                journal: journal.clone(),
                index: RwLock::new(state.readings),
                notifications: notifications.clone(),
            }),
            notifications,
            journal,
            config,
        })
    }

    /// Writes a snapshot of all stores and empties the WAL.
    ///
    /// Writes are blocked for the duration. If writing the snapshot fails the
    /// WAL is left untouched and will be replayed on next open.
    pub fn compact(&self) -> MonitorResult<CompactionResult> {
        let wal_size_before = self.wal_size()?;
        if wal_size_before <= HEADER_LEN {
            return Ok(CompactionResult {
                records: 0,
                up_to_sequence: None,
                wal_size_before,
                wal_size_after: wal_size_before,
            });
        }

        // Index locks before the WAL lock, the same order writers take them.
        let profiles = self.profiles.index.read().map_err(|_| lock_err("profile.compact"))?;
        let readings = self.readings.index.read().map_err(|_| lock_err("reading.compact"))?;
        let notifications = self
            .notifications
            .index
            .read()
            .map_err(|_| lock_err("notification.compact"))?;

        let mut records = 0;
        let up_to = self
            .journal
            .wal
            .checkpoint(|sequence| {
                let snapshot = Snapshot {
                    up_to_sequence: sequence,
                    created_at: Some(Utc::now()),
                    profiles: profiles.list(),
                    active: profiles.active_id(),
                    readings: readings.all(),
                    notifications: notifications.all(),
                };
                records = snapshot.record_count();
                snapshot.write(&self.dir)
            })
            .map_err(|e| open_err("compaction failed", e))?;
        drop((profiles, readings, notifications));

        let wal_size_after = self.wal_size()?;
        info!(up_to_sequence = up_to, records, wal_size_before, wal_size_after, "compacted write-ahead log");

        Ok(CompactionResult {
            records,
            up_to_sequence: Some(up_to),
            wal_size_before,
            wal_size_after,
        })
    }

    /// Compacts only when the WAL has outgrown `max_wal_size`.
    pub fn compact_if_needed(&self) -> MonitorResult<Option<CompactionResult>> {
        if self.wal_size()? < self.config.max_wal_size {
            return Ok(None);
        }
        self.compact().map(Some)
    }

    /// Current WAL size in bytes.
    pub fn wal_size(&self) -> MonitorResult<u64> {
        self.journal
            .wal
            .size_bytes()
            .map_err(|e| open_err("failed to stat WAL", e))
    }
}

/// Result of a compaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionResult {
    /// Records written to the snapshot.
    pub records: usize,
    /// Highest sequence covered, or `None` if there was nothing to compact.
    pub up_to_sequence: Option<u64>,
    /// WAL size before compaction.
    pub wal_size_before: u64,
    /// WAL size after compaction.
    pub wal_size_after: u64,
}

/// Index state rebuilt during open.
#[derive(Default)]
struct RecoveredState {
    profiles: ProfileIndex,
    readings: ReadingIndex,
    notifications: NotificationIndex,
}

impl RecoveredState {
    fn from_snapshot(snapshot: Snapshot) -> MonitorResult<Self> {
        let mut state = Self::default();
        for profile in snapshot.profiles {
            state.profiles.upsert(profile);
        }
        if let Some(id) = snapshot.active {
            state
                .profiles
                .set_active(id)
                .map_err(|e| open_err("snapshot references a missing active profile", e))?;
        }
        for reading in snapshot.readings {
            state.readings.insert(reading);
        }
        state.notifications.insert_batch(snapshot.notifications);
        Ok(state)
    }

    fn apply(&mut self, entry: WalEntry) -> MonitorResult<()> {
        let sequence = entry.sequence;
        let replay_err = |e: StorageError| open_err(&format!("failed to replay WAL entry {sequence}"), e);
        match entry.kind {
            WalEntryKind::ProfileUpsert(profile) => self.profiles.upsert(profile),
            WalEntryKind::ProfileActivate { id } => self.profiles.set_active(id).map_err(replay_err)?,
            WalEntryKind::ReadingCommit { reading, notifications } => {
                self.readings.insert(reading);
                self.notifications.insert_batch(notifications);
            }
            WalEntryKind::NotificationRead { id, at } => {
                self.notifications.mark_read(id, at).map_err(replay_err)?;
            }
        }
        debug!(sequence, "applied WAL entry");
        Ok(())
    }
}

// --- Profile Store ---

/// WAL-backed [`ProfileStore`].
#[derive(Debug)]
pub struct PersistentProfileStore {
    journal: Arc<Journal>,
    index: RwLock<ProfileIndex>,
}

impl ProfileStore for PersistentProfileStore {
    fn upsert(&self, profile: PlantProfile) -> Result<(), StorageError> {
        let mut index = self.index.write().map_err(|_| lock_err("profile.upsert"))?;
        self.journal.append(WalEntryKind::ProfileUpsert(profile.clone()))?;
        index.upsert(profile);
        Ok(())
    }

    fn get(&self, id: PlantId) -> Result<Option<PlantProfile>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("profile.get"))?;
        Ok(index.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<PlantProfile>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("profile.list"))?;
        Ok(index.list())
    }

    fn set_active(&self, id: PlantId) -> Result<(), StorageError> {
        let mut index = self.index.write().map_err(|_| lock_err("profile.set_active"))?;
        index.check_activatable(id)?;
        self.journal.append(WalEntryKind::ProfileActivate { id })?;
        index.set_active(id)
    }

    fn active(&self) -> Result<Option<PlantProfile>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("profile.active"))?;
        Ok(index.active().cloned())
    }
}

// --- Reading Log ---

/// WAL-backed [`ReadingLog`]. Writes notifications into the
/// [`PersistentNotificationStore`] opened alongside it.
#[derive(Debug)]
pub struct PersistentReadingLog {
    journal: Arc<Journal>,
    index: RwLock<ReadingIndex>,
    notifications: Arc<PersistentNotificationStore>,
}

impl ReadingLog for PersistentReadingLog {
    fn latest(&self, plant_id: PlantId) -> Result<Option<Reading>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("reading.latest"))?;
        Ok(index.latest(plant_id).cloned())
    }

    fn append_with_notifications(
        &self,
        reading: Reading,
        expected_prior: Option<ReadingId>,
        notifications: Vec<Notification>,
    ) -> Result<ReadingId, StorageError> {
        // Lock order: readings, notifications, WAL.
        let mut index = self.index.write().map_err(|_| lock_err("reading.append"))?;
        let mut notes = self
            .notifications
            .index
            .write()
            .map_err(|_| lock_err("notification.insert"))?;
        index.check_append(&reading, expected_prior)?;
        notes.check_batch(&notifications)?;

        self.journal.append(WalEntryKind::ReadingCommit {
            reading: reading.clone(),
            notifications: notifications.clone(),
        })?;
        notes.insert_batch(notifications);
        Ok(index.insert(reading))
    }

    fn get(&self, id: ReadingId) -> Result<Option<Reading>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("reading.get"))?;
        Ok(index.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<Reading>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("reading.recent"))?;
        Ok(index.recent(limit))
    }

    fn since(&self, since: DateTime<Utc>) -> Result<Vec<Reading>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("reading.since"))?;
        Ok(index.since(since))
    }

    fn count_for_plant(&self, plant_id: PlantId) -> Result<usize, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("reading.count"))?;
        Ok(index.count_for_plant(plant_id))
    }
}

// --- Notification Store ---

/// WAL-backed [`NotificationStore`].
#[derive(Debug)]
pub struct PersistentNotificationStore {
    journal: Arc<Journal>,
    index: RwLock<NotificationIndex>,
}

impl NotificationStore for PersistentNotificationStore {
    fn get(&self, id: NotificationId) -> Result<Option<Notification>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("notification.get"))?;
        Ok(index.get(id).cloned())
    }

    fn list(&self, limit: usize, unread_only: bool) -> Result<Vec<Notification>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("notification.list"))?;
        Ok(index.list(limit, unread_only))
    }

    fn mark_read(&self, id: NotificationId, at: DateTime<Utc>) -> Result<Notification, StorageError> {
        let mut index = self.index.write().map_err(|_| lock_err("notification.mark_read"))?;
        if index.get(id).is_none() {
            return Err(StorageError::NotificationNotFound(id));
        }
        self.journal.append(WalEntryKind::NotificationRead { id, at })?;
        index.mark_read(id, at)
    }

    fn find_by_plant(&self, plant_id: PlantId) -> Result<Vec<Notification>, StorageError> {
        let index = self.index.read().map_err(|_| lock_err("notification.find_by_plant"))?;
        Ok(index.find_by_plant(plant_id))
    }
}
