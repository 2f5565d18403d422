//! In-memory storage backend.
//!
//! This module provides thread-safe in-memory implementations of the storage traits.
//! It is intended for embedded usage, tests, and as a reference implementation.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::notification::{Notification, NotificationId};
use crate::profile::{PlantId, PlantProfile};
use crate::reading::{Reading, ReadingId};
use crate::storage::index::{NotificationIndex, ProfileIndex, ReadingIndex};
use crate::storage::traits::{NotificationStore, ProfileStore, ReadingLog, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory profile store.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    state: RwLock<ProfileIndex>,
}

impl InMemoryProfileStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn upsert(&self, profile: PlantProfile) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("profile.upsert"))?;
        state.upsert(profile);
        Ok(())
    }

    fn get(&self, id: PlantId) -> Result<Option<PlantProfile>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("profile.get"))?;
        Ok(state.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<PlantProfile>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("profile.list"))?;
        Ok(state.list())
    }

    fn set_active(&self, id: PlantId) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("profile.set_active"))?;
        state.set_active(id)
    }

    fn active(&self) -> Result<Option<PlantProfile>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("profile.active"))?;
        Ok(state.active().cloned())
    }
}

/// Thread-safe in-memory reading log.
///
/// Notifications appended with a reading land in the log's notification
/// store, see [`InMemoryReadingLog::notifications`].
#[derive(Debug, Default)]
pub struct InMemoryReadingLog {
    state: RwLock<ReadingIndex>,
    notifications: InMemoryNotificationStore,
}

impl InMemoryReadingLog {
    /// Create a new empty log with its own notification store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log that writes notifications into `notifications`.
    #[must_use]
    pub fn with_notifications(notifications: InMemoryNotificationStore) -> Self {
        Self {
            state: RwLock::default(),
            notifications,
        }
    }

    /// A handle to the notification store this log writes into.
    #[must_use]
    pub fn notifications(&self) -> InMemoryNotificationStore {
        self.notifications.clone()
    }
}

impl ReadingLog for InMemoryReadingLog {
    fn latest(&self, plant_id: PlantId) -> Result<Option<Reading>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("reading.latest"))?;
        Ok(state.latest(plant_id).cloned())
    }

    fn append_with_notifications(
        &self,
        reading: Reading,
        expected_prior: Option<ReadingId>,
        notifications: Vec<Notification>,
    ) -> Result<ReadingId, StorageError> {
        // Lock order: readings, then notifications.
        let mut state = self.state.write().map_err(|_| lock_err("reading.append"))?;
        let mut notes = self
            .notifications
            .state
            .write()
            .map_err(|_| lock_err("notification.insert"))?;
        state.check_append(&reading, expected_prior)?;
        notes.check_batch(&notifications)?;

        notes.insert_batch(notifications);
        Ok(state.insert(reading))
    }

    fn get(&self, id: ReadingId) -> Result<Option<Reading>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("reading.get"))?;
        Ok(state.get(id).cloned())
    }

    fn recent(&self, limit: usize) -> Result<Vec<Reading>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("reading.recent"))?;
        Ok(state.recent(limit))
    }

    fn since(&self, since: DateTime<Utc>) -> Result<Vec<Reading>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("reading.since"))?;
        Ok(state.since(since))
    }

    fn count_for_plant(&self, plant_id: PlantId) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("reading.count"))?;
        Ok(state.count_for_plant(plant_id))
    }
}

/// Thread-safe in-memory notification store.
///
/// Clones are handles to the same store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryNotificationStore {
    state: Arc<RwLock<NotificationIndex>>,
}

impl InMemoryNotificationStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl NotificationStore for InMemoryNotificationStore {
    fn get(&self, id: NotificationId) -> Result<Option<Notification>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("notification.get"))?;
        Ok(state.get(id).cloned())
    }

    fn list(&self, limit: usize, unread_only: bool) -> Result<Vec<Notification>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("notification.list"))?;
        Ok(state.list(limit, unread_only))
    }

    fn mark_read(&self, id: NotificationId, at: DateTime<Utc>) -> Result<Notification, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("notification.mark_read"))?;
        state.mark_read(id, at)
    }

    fn find_by_plant(&self, plant_id: PlantId) -> Result<Vec<Notification>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("notification.find_by_plant"))?;
        Ok(state.find_by_plant(plant_id))
    }
}

/// Convenience bundle of all in-memory stores, with the reading log writing
/// into the bundled notification store.
#[derive(Debug)]
pub struct InMemoryStores {
    /// Profile store.
    pub profiles: InMemoryProfileStore,
    /// Reading log.
    pub readings: InMemoryReadingLog,
    /// Notification store.
    pub notifications: InMemoryNotificationStore,
}

impl Default for InMemoryStores {
    fn default() -> Self {
        let notifications = InMemoryNotificationStore::new();
        Self {
            profiles: InMemoryProfileStore::new(),
            readings: InMemoryReadingLog::with_notifications(notifications.clone()),
            notifications,
        }
    }
}
