//! Abstract storage traits for plantwatch.
//!
//! These traits define the contract that storage backends must implement.
//! The monitor only talks to these traits, so the same evaluation logic runs
//! against the in-memory backend in tests and the WAL-backed one in production.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::notification::{Notification, NotificationId};
use crate::profile::{PlantId, PlantProfile};
use crate::reading::{Reading, ReadingId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Profile not found.
    #[error("Plant profile not found: {0}")]
    ProfileNotFound(PlantId),

    /// Notification not found.
    #[error("Notification not found: {0}")]
    NotificationNotFound(NotificationId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The plant's latest reading changed since it was read.
    #[error("Stale read for plant {plant_id}: expected latest {expected:?}, found {actual:?}")]
    StaleRead {
        /// Plant whose log moved.
        plant_id: PlantId,
        /// Latest reading the caller based its counter on.
        expected: Option<ReadingId>,
        /// Latest reading actually in the log.
        actual: Option<ReadingId>,
    },

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Storage trait for plant profiles and the active-profile selection.
pub trait ProfileStore: Send + Sync {
    /// Insert or replace a profile.
    fn upsert(&self, profile: PlantProfile) -> Result<(), StorageError>;

    /// Get a profile by id.
    fn get(&self, id: PlantId) -> Result<Option<PlantProfile>, StorageError>;

    /// List all profiles ordered by id.
    fn list(&self) -> Result<Vec<PlantProfile>, StorageError>;

    /// Select the active profile. Returns `ProfileNotFound` if it does not exist.
    fn set_active(&self, id: PlantId) -> Result<(), StorageError>;

    /// The currently active profile, if one is selected.
    fn active(&self) -> Result<Option<PlantProfile>, StorageError>;
}

/// Append-only log of evaluated readings.
///
/// The log is also the only writer of notifications: a reading and the
/// notifications it fired are appended as one unit, into the notification
/// store the log was built with.
///
/// # Concurrency
/// Appends are compare-and-append: they succeed only if the plant's latest
/// reading is still `expected_prior`. Callers that lose the race receive
/// `StaleRead` and must recompute their counter from the new latest reading.
pub trait ReadingLog: Send + Sync {
    /// The most recent reading for a plant.
    fn latest(&self, plant_id: PlantId) -> Result<Option<Reading>, StorageError>;

    /// Append a reading and the notifications it fired: both or neither,
    /// including across a crash.
    fn append_with_notifications(
        &self,
        reading: Reading,
        expected_prior: Option<ReadingId>,
        notifications: Vec<Notification>,
    ) -> Result<ReadingId, StorageError>;

    /// Append a reading that fired nothing.
    fn append(&self, reading: Reading, expected_prior: Option<ReadingId>) -> Result<ReadingId, StorageError> {
        self.append_with_notifications(reading, expected_prior, Vec::new())
    }

    /// Get a reading by id.
    fn get(&self, id: ReadingId) -> Result<Option<Reading>, StorageError>;

    /// Most recent readings across all plants, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<Reading>, StorageError>;

    /// All readings recorded at or after `since`, oldest first.
    fn since(&self, since: DateTime<Utc>) -> Result<Vec<Reading>, StorageError>;

    /// Count readings for a plant.
    fn count_for_plant(&self, plant_id: PlantId) -> Result<usize, StorageError>;
}

/// Storage trait for notifications.
///
/// New notifications arrive only through
/// [`ReadingLog::append_with_notifications`].
pub trait NotificationStore: Send + Sync {
    /// Get a notification by id.
    fn get(&self, id: NotificationId) -> Result<Option<Notification>, StorageError>;

    /// Most recent notifications, newest first.
    fn list(&self, limit: usize, unread_only: bool) -> Result<Vec<Notification>, StorageError>;

    /// Mark a notification read and return its updated state.
    fn mark_read(&self, id: NotificationId, at: DateTime<Utc>) -> Result<Notification, StorageError>;

    /// All notifications for a plant, oldest first.
    fn find_by_plant(&self, plant_id: PlantId) -> Result<Vec<Notification>, StorageError>;
}
