//! In-memory indexes shared by the in-memory and persistent backends.
//!
//! The persistent backend keeps the same indexes in memory and rebuilds them
//! by replaying its write-ahead log, so both backends enforce identical rules.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::notification::{Notification, NotificationId};
use crate::profile::{PlantId, PlantProfile};
use crate::reading::{Reading, ReadingId};

use super::traits::StorageError;

#[derive(Debug, Default, Clone)]
pub(crate) struct ProfileIndex {
    by_id: BTreeMap<PlantId, PlantProfile>,
    active: Option<PlantId>,
}

impl ProfileIndex {
    pub(crate) fn upsert(&mut self, profile: PlantProfile) {
        self.by_id.insert(profile.id, profile);
    }

    pub(crate) fn get(&self, id: PlantId) -> Option<&PlantProfile> {
        self.by_id.get(&id)
    }

    pub(crate) fn list(&self) -> Vec<PlantProfile> {
        self.by_id.values().cloned().collect()
    }

    pub(crate) fn check_activatable(&self, id: PlantId) -> Result<(), StorageError> {
        if self.by_id.contains_key(&id) {
            Ok(())
        } else {
            Err(StorageError::ProfileNotFound(id))
        }
    }

    pub(crate) fn set_active(&mut self, id: PlantId) -> Result<(), StorageError> {
        self.check_activatable(id)?;
        self.active = Some(id);
        Ok(())
    }

    pub(crate) fn active(&self) -> Option<&PlantProfile> {
        self.active.and_then(|id| self.by_id.get(&id))
    }

    #[cfg_attr(not(feature = "persistent"), allow(dead_code))]
    pub(crate) fn active_id(&self) -> Option<PlantId> {
        self.active
    }
}

/// Readings keyed by a log sequence number, with a per-plant stack of
/// sequence numbers so the latest reading is an O(1) lookup.
#[derive(Debug, Default, Clone)]
pub(crate) struct ReadingIndex {
    next_seq: u64,
    by_seq: BTreeMap<u64, Reading>,
    seq_by_id: HashMap<ReadingId, u64>,
    by_plant: HashMap<PlantId, Vec<u64>>,
}

impl ReadingIndex {
    pub(crate) fn latest(&self, plant_id: PlantId) -> Option<&Reading> {
        let seq = self.by_plant.get(&plant_id)?.last()?;
        self.by_seq.get(seq)
    }

    pub(crate) fn check_append(
        &self,
        reading: &Reading,
        expected_prior: Option<ReadingId>,
    ) -> Result<(), StorageError> {
        if self.seq_by_id.contains_key(&reading.id) {
            return Err(StorageError::DuplicateKey(reading.id.to_string()));
        }
        let actual = self.latest(reading.plant_id).map(|r| r.id);
        if actual != expected_prior {
            return Err(StorageError::StaleRead {
                plant_id: reading.plant_id,
                expected: expected_prior,
                actual,
            });
        }
        Ok(())
    }

    /// Inserts without the compare step. Callers must run `check_append` first
    /// (or be replaying an already-validated log).
    pub(crate) fn insert(&mut self, reading: Reading) -> ReadingId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = reading.id;
        self.seq_by_id.insert(id, seq);
        self.by_plant.entry(reading.plant_id).or_default().push(seq);
        self.by_seq.insert(seq, reading);
        id
    }

    pub(crate) fn get(&self, id: ReadingId) -> Option<&Reading> {
        self.seq_by_id.get(&id).and_then(|seq| self.by_seq.get(seq))
    }

    pub(crate) fn recent(&self, limit: usize) -> Vec<Reading> {
        self.by_seq.values().rev().take(limit).cloned().collect()
    }

    pub(crate) fn since(&self, since: DateTime<Utc>) -> Vec<Reading> {
        self.by_seq
            .values()
            .filter(|r| r.recorded_at >= since)
            .cloned()
            .collect()
    }

    pub(crate) fn count_for_plant(&self, plant_id: PlantId) -> usize {
        self.by_plant.get(&plant_id).map_or(0, Vec::len)
    }

    /// Every reading in log order.
    #[cfg_attr(not(feature = "persistent"), allow(dead_code))]
    pub(crate) fn all(&self) -> Vec<Reading> {
        self.by_seq.values().cloned().collect()
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct NotificationIndex {
    ordered: Vec<NotificationId>,
    by_id: HashMap<NotificationId, Notification>,
}

impl NotificationIndex {
    pub(crate) fn check_batch(&self, batch: &[Notification]) -> Result<(), StorageError> {
        for (i, n) in batch.iter().enumerate() {
            if self.by_id.contains_key(&n.id) || batch[..i].iter().any(|m| m.id == n.id) {
                return Err(StorageError::DuplicateKey(n.id.to_string()));
            }
        }
        Ok(())
    }

    pub(crate) fn insert_batch(&mut self, batch: Vec<Notification>) {
        for n in batch {
            self.ordered.push(n.id);
            self.by_id.insert(n.id, n);
        }
    }

    pub(crate) fn get(&self, id: NotificationId) -> Option<&Notification> {
        self.by_id.get(&id)
    }

    pub(crate) fn list(&self, limit: usize, unread_only: bool) -> Vec<Notification> {
        self.ordered
            .iter()
            .rev()
            .filter_map(|id| self.by_id.get(id))
            .filter(|n| !unread_only || !n.is_read)
            .take(limit)
            .cloned()
            .collect()
    }

    pub(crate) fn mark_read(
        &mut self,
        id: NotificationId,
        at: DateTime<Utc>,
    ) -> Result<Notification, StorageError> {
        let n = self
            .by_id
            .get_mut(&id)
            .ok_or(StorageError::NotificationNotFound(id))?;
        n.mark_read(at);
        Ok(n.clone())
    }

    pub(crate) fn find_by_plant(&self, plant_id: PlantId) -> Vec<Notification> {
        self.ordered
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .filter(|n| n.plant_id == plant_id)
            .cloned()
            .collect()
    }

    /// Every notification in insertion order.
    #[cfg_attr(not(feature = "persistent"), allow(dead_code))]
    pub(crate) fn all(&self) -> Vec<Notification> {
        self.ordered
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .cloned()
            .collect()
    }
}
