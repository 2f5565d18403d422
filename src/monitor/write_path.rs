//! The per-plant read-prior / compute / write critical section.
//!
//! Callers hold the plant's in-process lock around [`commit`]. The reading
//! log's compare-and-append catches writers outside this process; those
//! surface as [`CommitError::Conflict`] and the caller retries.

use crate::error::MonitorError;
use crate::notification::Notification;
use crate::profile::PlantProfile;
use crate::reading::{Reading, ReadingId, SensorSample};
use crate::storage::{ReadingLog, StorageError};
use crate::threshold::{emit, next_warning_level, Evaluation};

/// What one successful commit recorded.
#[derive(Debug)]
pub(crate) struct Committed {
    pub reading_id: ReadingId,
    pub warning_level: u32,
    pub notifications: Vec<Notification>,
}

#[derive(Debug)]
pub(crate) enum CommitError {
    /// The plant's latest reading moved between read and append.
    Conflict,
    /// Anything else. Nothing was recorded.
    Failed(MonitorError),
}

impl From<StorageError> for CommitError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::StaleRead { .. } => Self::Conflict,
            other => Self::Failed(other.into()),
        }
    }
}

/// Records a reading and, if it fires, its notifications as one append.
pub(crate) fn commit(
    readings: &dyn ReadingLog,
    profile: &PlantProfile,
    sample: SensorSample,
    evaluation: &Evaluation,
) -> Result<Committed, CommitError> {
    let prior = readings.latest(profile.id)?;
    let warning_level = next_warning_level(prior.as_ref(), evaluation.has_violation());

    let reading = Reading::new(profile.id, sample, warning_level);
    let emitted = emit(profile, &evaluation.violations, warning_level);
    let reading_id = readings.append_with_notifications(reading, prior.map(|r| r.id), emitted.clone())?;

    Ok(Committed {
        reading_id,
        warning_level,
        notifications: emitted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PlantId;
    use crate::storage::{InMemoryReadingLog, NotificationStore};
    use crate::threshold::evaluate;

    fn profile() -> PlantProfile {
        PlantProfile::builder()
            .id(1)
            .name("Tomato")
            .soil_moisture(40.0, 60.0)
            .temperature(20.0, 28.0)
            .humidity(60.0, 80.0)
            .warning_trigger(2)
            .build()
            .unwrap()
    }

    fn run(log: &InMemoryReadingLog, sample: SensorSample) -> Committed {
        let profile = profile();
        let evaluation = evaluate(&sample, &profile);
        commit(log, &profile, sample, &evaluation).unwrap()
    }

    #[test]
    fn test_counter_accumulates_and_fires() {
        let log = InMemoryReadingLog::new();
        let dry = SensorSample::new(30.0, 24.0, 70.0);

        let first = run(&log, dry);
        assert_eq!(first.warning_level, 1);
        assert!(first.notifications.is_empty());

        let second = run(&log, dry);
        assert_eq!(second.warning_level, 2);
        assert_eq!(second.notifications.len(), 1);
        assert_eq!(log.notifications().find_by_plant(PlantId::new(1)).unwrap().len(), 1);

        let clean = run(&log, SensorSample::new(50.0, 24.0, 70.0));
        assert_eq!(clean.warning_level, 0);
        assert_eq!(log.count_for_plant(PlantId::new(1)).unwrap(), 3);
    }

    #[test]
    fn test_stale_read_is_conflict() {
        let err: CommitError = StorageError::StaleRead {
            plant_id: PlantId::new(1),
            expected: None,
            actual: None,
        }
        .into();
        assert!(matches!(err, CommitError::Conflict));

        let err: CommitError = StorageError::BackendError("disk".to_string()).into();
        assert!(matches!(err, CommitError::Failed(e) if e.is_execution()));
    }
}
