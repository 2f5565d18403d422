//! Write-ahead log.
//!
//! Every mutation is appended (and optionally fsynced) before it is applied to
//! the in-memory indexes. On open the log is scanned: a frame torn by a crash
//! at the tail is cut off, while a damaged frame in the middle fails the open.
//!
//! # File Format
//! ```text
//! [MAGIC: 4 bytes][VERSION: 1 byte]
//! [FRAME 1: codec-encoded WalEntry]
//! [FRAME 2: codec-encoded WalEntry]
//! ...
//! ```

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Error as IoError, ErrorKind, Result as IoResult, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::notification::{Notification, NotificationId};
use crate::profile::{PlantId, PlantProfile};
use crate::reading::Reading;

use super::codec;

/// A single entry in the write-ahead log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    /// Monotonically increasing sequence number. Never reset by checkpoints.
    pub sequence: u64,
    /// When this entry was written.
    pub timestamp: DateTime<Utc>,
    /// The logged mutation.
    pub kind: WalEntryKind,
}

/// The logged mutation.
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WalEntryKind {
    ProfileUpsert(PlantProfile),
    ProfileActivate { id: PlantId },
    /// A reading and the notifications it fired, replayed together.
    ReadingCommit {
        reading: Reading,
        notifications: Vec<Notification>,
    },
    NotificationRead { id: NotificationId, at: DateTime<Utc> },
}

struct WalWriter {
    file: BufWriter<File>,
    sequence: u64,
}

/// Append-only write-ahead log. Thread-safe via an internal mutex.
pub struct WriteAheadLog {
    path: PathBuf,
    writer: Mutex<WalWriter>,
    sync_on_write: bool,
}

impl std::fmt::Debug for WriteAheadLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteAheadLog")
            .field("path", &self.path)
            .field("sync_on_write", &self.sync_on_write)
            .finish_non_exhaustive()
    }
}

impl WriteAheadLog {
    /// Opens or creates a log, returning it with every intact entry for replay.
    ///
    /// `base_sequence` is the highest sequence already covered by a snapshot;
    /// new entries are numbered after both it and the last logged entry.
    pub fn open(path: &Path, sync_on_write: bool, base_sequence: u64) -> IoResult<(Self, Vec<WalEntry>)> {
        let fresh = !path.exists() || std::fs::metadata(path)?.len() < codec::HEADER_LEN;
        if fresh {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)?;
            codec::write_header(&mut file)?;
            file.sync_all()?;
        }

        let (entries, valid_len) = Self::scan(path)?;
        let file_len = std::fs::metadata(path)?.len();
        if file_len > valid_len {
            warn!(
                path = %path.display(),
                torn_bytes = file_len - valid_len,
                "discarding torn write-ahead log tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        let last_logged = entries.last().map_or(0, |e| e.sequence);
        let file = OpenOptions::new().append(true).open(path)?;

        Ok((
            Self {
                path: path.to_path_buf(),
                writer: Mutex::new(WalWriter {
                    file: BufWriter::new(file),
                    sequence: last_logged.max(base_sequence),
                }),
                sync_on_write,
            },
            entries,
        ))
    }

    /// Reads every intact frame and the byte offset just past the last one.
    fn scan(path: &Path) -> IoResult<(Vec<WalEntry>, u64)> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        codec::read_header(&mut reader)?;

        let mut entries = Vec::new();
        let mut valid_len = reader.stream_position()?;
        loop {
            match codec::decode::<WalEntry>(&mut reader) {
                Ok(entry) => {
                    entries.push(entry);
                    valid_len = reader.stream_position()?;
                }
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => {
                    return Err(IoError::new(
                        ErrorKind::InvalidData,
                        format!(
                            "write-ahead log corrupted after sequence {}: {e}",
                            entries.last().map_or(0, |x: &WalEntry| x.sequence)
                        ),
                    ));
                }
            }
        }
        Ok((entries, valid_len))
    }

    fn lock(&self) -> IoResult<MutexGuard<'_, WalWriter>> {
        self.writer
            .lock()
            .map_err(|_| IoError::new(ErrorKind::Other, "poisoned lock: wal.writer"))
    }

    /// Appends an entry and returns its sequence number.
    pub fn append(&self, kind: WalEntryKind) -> IoResult<u64> {
        let mut writer = self.lock()?;
        let sequence = writer.sequence + 1;
        let frame = codec::encode(&WalEntry {
            sequence,
            timestamp: Utc::now(),
            kind,
        })?;

        writer.file.write_all(&frame)?;
        writer.file.flush()?;
        if self.sync_on_write {
            writer.file.get_ref().sync_data()?;
        }
        writer.sequence = sequence;
        Ok(sequence)
    }

    /// Runs `write_snapshot` with the current sequence while appends are
    /// blocked, then empties the log. If the snapshot fails the log is kept.
    pub fn checkpoint<F>(&self, write_snapshot: F) -> IoResult<u64>
    where
        F: FnOnce(u64) -> IoResult<()>,
    {
        let mut writer = self.lock()?;
        writer.file.flush()?;
        let sequence = writer.sequence;
        write_snapshot(sequence)?;

        let file = writer.file.get_ref();
        file.set_len(codec::HEADER_LEN)?;
        file.sync_all()?;
        Ok(sequence)
    }

    /// The last assigned sequence number.
    pub fn current_sequence(&self) -> IoResult<u64> {
        Ok(self.lock()?.sequence)
    }

    /// Current log size in bytes.
    pub fn size_bytes(&self) -> IoResult<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}
