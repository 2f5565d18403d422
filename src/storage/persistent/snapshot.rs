//! Snapshot files written by compaction.
//!
//! A snapshot holds the full index state covered by the log up to
//! `up_to_sequence`. It is written to a temporary file, fsynced and renamed
//! into place, so a reader sees either the previous snapshot or the new one.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Error as IoError, ErrorKind, Result as IoResult, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notification::Notification;
use crate::profile::{PlantId, PlantProfile};
use crate::reading::Reading;

use super::codec;

/// Name of the snapshot file inside the data directory.
pub const SNAPSHOT_FILE: &str = "snapshot.plnt";
const SNAPSHOT_TMP: &str = "snapshot.plnt.tmp";

/// Full store state at a log sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Highest log sequence reflected in this snapshot.
    pub up_to_sequence: u64,
    /// When the snapshot was taken.
    pub created_at: Option<DateTime<Utc>>,
    /// All profiles.
    pub profiles: Vec<PlantProfile>,
    /// The active profile selection.
    pub active: Option<PlantId>,
    /// All readings in log order.
    pub readings: Vec<Reading>,
    /// All notifications in insertion order.
    pub notifications: Vec<Notification>,
}

impl Snapshot {
    /// Loads the snapshot in `dir`, if one exists.
    ///
    /// Snapshots are renamed into place whole, so any decoding failure here
    /// is reported as corruption rather than a torn write.
    pub fn load(dir: &Path) -> IoResult<Option<Self>> {
        let path = dir.join(SNAPSHOT_FILE);
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = BufReader::new(File::open(&path)?);
        codec::read_header(&mut reader)?;
        let snapshot = codec::decode(&mut reader).map_err(|e| {
            IoError::new(
                ErrorKind::InvalidData,
                format!("snapshot {} is corrupted: {e}", path.display()),
            )
        })?;
        Ok(Some(snapshot))
    }

    /// Atomically replaces the snapshot in `dir`.
    pub fn write(&self, dir: &Path) -> IoResult<()> {
        let tmp = dir.join(SNAPSHOT_TMP);
        let frame = codec::encode(self)?;
        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp)?;
            let mut writer = BufWriter::new(file);
            codec::write_header(&mut writer)?;
            writer.write_all(&frame)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }

        fs::rename(&tmp, dir.join(SNAPSHOT_FILE))?;
        #[cfg(unix)]
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    /// Number of records held.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.profiles.len() + self.readings.len() + self.notifications.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::SensorSample;
    use tempfile::tempdir;

    #[test]
    fn test_missing_snapshot_is_none() {
        let dir = tempdir().unwrap();
        assert!(Snapshot::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_write_replaces_previous() {
        let dir = tempdir().unwrap();
        let plant = PlantId::new(9);

        let first = Snapshot {
            up_to_sequence: 3,
            ..Snapshot::default()
        };
        first.write(dir.path()).unwrap();

        let second = Snapshot {
            up_to_sequence: 7,
            active: Some(plant),
            readings: vec![Reading::new(plant, SensorSample::new(50.0, 22.0, 65.0), 0)],
            ..Snapshot::default()
        };
        second.write(dir.path()).unwrap();

        let loaded = Snapshot::load(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.up_to_sequence, 7);
        assert_eq!(loaded.active, Some(plant));
        assert_eq!(loaded.record_count(), 1);
        assert!(!dir.path().join(SNAPSHOT_TMP).exists());
    }

    #[test]
    fn test_truncated_snapshot_is_corruption() {
        let dir = tempdir().unwrap();
        Snapshot {
            up_to_sequence: 1,
            ..Snapshot::default()
        }
        .write(dir.path())
        .unwrap();

        let path = dir.path().join(SNAPSHOT_FILE);
        let len = fs::metadata(&path).unwrap().len();
        OpenOptions::new().write(true).open(&path).unwrap().set_len(len - 2).unwrap();

        let err = Snapshot::load(dir.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
    }
}
