//! Threshold-violation monitor.
//!
//! [`PlantMonitor`] ties the pure evaluation pieces in [`crate::threshold`] to
//! the storage collaborators: it resolves the active profile, evaluates a
//! sample, advances the plant's consecutive-violation counter and records the
//! reading together with any notifications it fires.
//!
//! Evaluations for the same plant are serialized; different plants proceed in
//! parallel.

/// Sharded worker pool for concurrent ingest.
pub mod runtime;
mod result;
mod statistics;
/// Subscriber stream handle.
pub mod stream;
mod write_path;

pub use result::EvaluationResult;
pub use runtime::{IngestHandle, IngestRuntime};
pub use statistics::SensorStatistics;
pub use stream::{NotificationFeed, NotificationStream};

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::{ExecutionError, FailureKind, MonitorError, MonitorResult, ValidationError};
use crate::notification::{Notification, NotificationId, NotificationView};
use crate::profile::{PlantId, PlantProfile};
use crate::reading::{Reading, SensorSample};
use crate::storage::{NotificationStore, ProfileStore, ReadingLog, StorageError};
use crate::threshold::{evaluate, AlertState};

use write_path::{commit, CommitError};

/// The threshold-violation monitor.
pub struct PlantMonitor {
    profiles: Arc<dyn ProfileStore>,
    readings: Arc<dyn ReadingLog>,
    notifications: Arc<dyn NotificationStore>,
    config: MonitorConfig,
    plant_locks: Mutex<HashMap<PlantId, Arc<Mutex<()>>>>,
    feed: NotificationFeed,
}

impl std::fmt::Debug for PlantMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlantMonitor")
            .field("config", &self.config)
            .field("feed", &self.feed)
            .finish_non_exhaustive()
    }
}

impl PlantMonitor {
    /// Create a monitor over the given stores.
    ///
    /// `notifications` must be the store `readings` writes notifications
    /// into, as paired by [`crate::storage::InMemoryStores`] and
    /// `PersistentStores`.
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        readings: Arc<dyn ReadingLog>,
        notifications: Arc<dyn NotificationStore>,
        config: MonitorConfig,
    ) -> MonitorResult<Self> {
        let config = config.validate()?;
        Ok(Self {
            profiles,
            readings,
            notifications,
            feed: NotificationFeed::new(config.feed_capacity),
            config,
            plant_locks: Mutex::new(HashMap::new()),
        })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &MonitorConfig {
        &self.config
    }

    // --- Profiles ---

    /// Validates and stores a profile.
    pub fn register_profile(&self, profile: PlantProfile) -> MonitorResult<()> {
        profile.validate()?;
        let id = profile.id;
        self.profiles.upsert(profile)?;
        info!(plant_id = %id, "registered plant profile");
        Ok(())
    }

    /// Makes `plant_id` the active plant.
    pub fn activate(&self, plant_id: PlantId) -> MonitorResult<()> {
        self.profiles.set_active(plant_id).map_err(|e| match e {
            StorageError::ProfileNotFound(id) => ExecutionError::ProfileNotFound { id }.into(),
            other => MonitorError::from(other),
        })?;
        info!(%plant_id, "activated plant profile");
        Ok(())
    }

    /// The active profile, or `NoActiveProfile`.
    pub fn active_profile(&self) -> MonitorResult<PlantProfile> {
        self.profiles
            .active()?
            .ok_or_else(|| ExecutionError::NoActiveProfile.into())
    }

    // --- Evaluation ---

    /// Evaluates one reading for `plant_id`, which must be the active plant.
    ///
    /// Never panics on expected failures: they come back as a failed
    /// [`EvaluationResult`] with a [`crate::FailureKind`].
    pub fn evaluate_reading(
        &self,
        plant_id: PlantId,
        soil_moisture: f64,
        temperature: f64,
        humidity: f64,
    ) -> EvaluationResult {
        let sample = SensorSample::new(soil_moisture, temperature, humidity);
        self.try_evaluate_reading(plant_id, sample)
            .unwrap_or_else(|e| Self::failed(plant_id, &e))
    }

    /// Evaluates a sample against whichever profile is active.
    pub fn evaluate_active(&self, sample: SensorSample) -> EvaluationResult {
        match self.active_profile() {
            Ok(profile) => self
                .try_evaluate_reading(profile.id, sample)
                .unwrap_or_else(|e| Self::failed(profile.id, &e)),
            Err(e) => {
                debug!(error = %e, "evaluation rejected");
                EvaluationResult::from(e)
            }
        }
    }

    /// Like [`Self::evaluate_reading`] but returns failures as `Err`.
    pub fn try_evaluate_reading(&self, plant_id: PlantId, sample: SensorSample) -> MonitorResult<EvaluationResult> {
        sample.validate(&self.config.limits)?;
        self.record(plant_id, sample)
    }

    /// Records a clean reading at the midpoint of every range of the active
    /// profile, resetting its counter to zero.
    pub fn reset_violations(&self) -> MonitorResult<EvaluationResult> {
        let profile = self.active_profile()?;
        let midpoint = SensorSample::new(
            profile.soil_moisture.midpoint(),
            profile.temperature.midpoint(),
            profile.humidity.midpoint(),
        );
        let result = self.record(profile.id, midpoint)?;
        info!(plant_id = %profile.id, "reset violation streak");
        Ok(result)
    }

    fn failed(plant_id: PlantId, err: &MonitorError) -> EvaluationResult {
        match err.kind() {
            FailureKind::InvalidReadingValue | FailureKind::NoActiveProfile => {
                debug!(%plant_id, error = %err, "evaluation rejected");
            }
            _ => warn!(%plant_id, error = %err, "evaluation failed"),
        }
        let mut result = EvaluationResult::from(err);
        result.plant_id = Some(plant_id);
        result
    }

    /// Serialized evaluate-and-write for one plant, retried on conflicts.
    fn record(&self, plant_id: PlantId, sample: SensorSample) -> MonitorResult<EvaluationResult> {
        let lock = self.plant_lock(plant_id)?;
        let _guard = lock
            .lock()
            .map_err(|_| MonitorError::internal(format!("poisoned lock: plant {plant_id}")))?;

        let max_attempts = self.config.max_conflict_retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;

            // The profile is resolved afresh on every attempt.
            let profile = self.active_profile()?;
            if profile.id != plant_id {
                return Err(ValidationError::PlantNotActive {
                    requested: plant_id,
                    active: profile.id,
                }
                .into());
            }
            let evaluation = evaluate(&sample, &profile);

            match commit(self.readings.as_ref(), &profile, sample, &evaluation) {
                Ok(committed) => {
                    let triggered = !committed.notifications.is_empty();
                    let alert_state = AlertState::from_level(committed.warning_level, profile.warning_trigger);
                    debug!(
                        %plant_id,
                        reading_id = %committed.reading_id,
                        warning_level = committed.warning_level,
                        violations = evaluation.violation_count(),
                        ?alert_state,
                        "recorded reading"
                    );
                    if triggered {
                        info!(
                            %plant_id,
                            warning_level = committed.warning_level,
                            notifications = committed.notifications.len(),
                            "warning trigger reached"
                        );
                    }
                    self.feed.publish(&committed.notifications);

                    let message = if triggered {
                        format!(
                            "Reading recorded; {} notification(s) raised for {}",
                            committed.notifications.len(),
                            profile.name
                        )
                    } else {
                        "Reading recorded".to_string()
                    };
                    return Ok(EvaluationResult {
                        success: true,
                        plant_id: Some(plant_id),
                        reading_id: Some(committed.reading_id),
                        warning_level: committed.warning_level,
                        current_violation_count: evaluation.violation_count(),
                        violations: evaluation.violations,
                        notification_triggered: triggered,
                        notification_ids: committed.notifications.iter().map(|n| n.id).collect(),
                        alert_state: Some(alert_state),
                        message,
                        failure: None,
                    });
                }
                Err(CommitError::Conflict) if attempt < max_attempts => {
                    warn!(%plant_id, attempt, "reading log moved underneath evaluation, retrying");
                }
                Err(CommitError::Conflict) => {
                    return Err(ExecutionError::ConcurrentUpdate {
                        plant_id,
                        attempts: attempt,
                    }
                    .into());
                }
                Err(CommitError::Failed(e)) => return Err(e),
            }
        }
    }

    fn plant_lock(&self, plant_id: PlantId) -> MonitorResult<Arc<Mutex<()>>> {
        let mut locks = self
            .plant_locks
            .lock()
            .map_err(|_| MonitorError::internal("poisoned lock: monitor.plant_locks"))?;
        Ok(Arc::clone(locks.entry(plant_id).or_default()))
    }

    // --- Queries ---

    /// Alerting state of a plant from its latest reading.
    pub fn alert_state(&self, plant_id: PlantId) -> MonitorResult<AlertState> {
        let profile = self
            .profiles
            .get(plant_id)?
            .ok_or(ExecutionError::ProfileNotFound { id: plant_id })?;
        let level = self.readings.latest(plant_id)?.map_or(0, |r| r.warning_level);
        Ok(AlertState::from_level(level, profile.warning_trigger))
    }

    /// Most recent readings across plants, newest first.
    pub fn latest_readings(&self, limit: usize) -> MonitorResult<Vec<Reading>> {
        Ok(self.readings.recent(limit)?)
    }

    /// Statistics over readings recorded within the trailing `window`.
    ///
    /// A window reaching past the earliest representable time covers every
    /// reading. Negative windows are rejected.
    pub fn sensor_statistics(&self, window: chrono::Duration) -> MonitorResult<SensorStatistics> {
        if window < chrono::Duration::zero() {
            return Err(ValidationError::InvalidConfig {
                reason: format!("statistics window must not be negative, got {window}"),
            }
            .into());
        }
        let since = Utc::now()
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let readings = self.readings.since(since)?;
        Ok(SensorStatistics::from_readings(since, &readings))
    }

    /// Most recent notifications, newest first.
    pub fn notifications(&self, limit: usize, unread_only: bool) -> MonitorResult<Vec<Notification>> {
        Ok(self.notifications.list(limit, unread_only)?)
    }

    /// Marks a notification read and returns it.
    pub fn mark_notification_read(&self, id: NotificationId) -> MonitorResult<Notification> {
        self.notifications.mark_read(id, Utc::now()).map_err(|e| match e {
            StorageError::NotificationNotFound(id) => ExecutionError::NotificationNotFound { id }.into(),
            other => MonitorError::from(other),
        })
    }

    /// Flattened view of a notification joined with its plant's names.
    pub fn notification_view(&self, id: NotificationId) -> MonitorResult<NotificationView> {
        let notification = self
            .notifications
            .get(id)?
            .ok_or(ExecutionError::NotificationNotFound { id })?;
        let profile = self.profiles.get(notification.plant_id)?;
        Ok(notification.view(profile.as_ref()))
    }

    /// Subscribes to notifications as they are committed.
    pub fn subscribe(&self) -> MonitorResult<NotificationStream> {
        self.feed.subscribe()
    }

    /// Notifications dropped because a subscriber fell behind.
    #[must_use]
    pub fn dropped_notifications(&self) -> u64 {
        self.feed.dropped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStores;

    fn monitor() -> PlantMonitor {
        let stores = InMemoryStores::default();
        let monitor = PlantMonitor::new(
            Arc::new(stores.profiles),
            Arc::new(stores.readings),
            Arc::new(stores.notifications),
            MonitorConfig::default(),
        )
        .unwrap();
        monitor
            .register_profile(
                PlantProfile::builder()
                    .id(7)
                    .name("Tomato")
                    .local_name("Kamatis")
                    .soil_moisture(40.0, 60.0)
                    .temperature(20.0, 28.0)
                    .humidity(60.0, 80.0)
                    .warning_trigger(3)
                    .suggested_action("Water the plant")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        monitor.activate(PlantId::new(7)).unwrap();
        monitor
    }

    #[test]
    fn test_no_active_profile() {
        let stores = InMemoryStores::default();
        let monitor = PlantMonitor::new(
            Arc::new(stores.profiles),
            Arc::new(stores.readings),
            Arc::new(stores.notifications),
            MonitorConfig::default(),
        )
        .unwrap();

        let result = monitor.evaluate_reading(PlantId::new(1), 50.0, 24.0, 70.0);
        assert!(result.failed_with(FailureKind::NoActiveProfile));
        assert!(monitor.latest_readings(10).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_value_rejected_before_write() {
        let monitor = monitor();

        let result = monitor.evaluate_reading(PlantId::new(7), f64::NAN, 24.0, 70.0);
        assert!(result.failed_with(FailureKind::InvalidReadingValue));

        let result = monitor.evaluate_reading(PlantId::new(7), 50.0, 24.0, 140.0);
        assert!(result.failed_with(FailureKind::InvalidReadingValue));
        assert!(monitor.latest_readings(10).unwrap().is_empty());
    }

    #[test]
    fn test_inactive_plant_rejected() {
        let monitor = monitor();
        let result = monitor.evaluate_reading(PlantId::new(8), 50.0, 24.0, 70.0);
        assert!(result.failed_with(FailureKind::InvalidReadingValue));
        assert!(result.message.contains("not the active plant"));
    }

    #[test]
    fn test_alert_state_follows_counter() {
        let monitor = monitor();
        let plant = PlantId::new(7);
        assert_eq!(monitor.alert_state(plant).unwrap(), AlertState::Clean);

        monitor.evaluate_reading(plant, 30.0, 24.0, 70.0);
        assert_eq!(monitor.alert_state(plant).unwrap(), AlertState::Accumulating);
        monitor.evaluate_reading(plant, 30.0, 24.0, 70.0);
        monitor.evaluate_reading(plant, 30.0, 24.0, 70.0);
        assert_eq!(monitor.alert_state(plant).unwrap(), AlertState::Triggered);
        monitor.evaluate_reading(plant, 30.0, 24.0, 70.0);
        assert_eq!(monitor.alert_state(plant).unwrap(), AlertState::Elevated);
    }

    #[test]
    fn test_reset_records_midpoint() {
        let monitor = monitor();
        let plant = PlantId::new(7);
        monitor.evaluate_reading(plant, 30.0, 24.0, 70.0);

        let result = monitor.reset_violations().unwrap();
        assert_eq!(result.warning_level, 0);

        let latest = &monitor.latest_readings(1).unwrap()[0];
        assert_eq!(latest.sample, SensorSample::new(50.0, 24.0, 70.0));
        assert_eq!(latest.warning_level, 0);
    }

    #[test]
    fn test_notification_read_and_view() {
        let monitor = monitor();
        let plant = PlantId::new(7);
        for _ in 0..3 {
            monitor.evaluate_reading(plant, 30.0, 24.0, 70.0);
        }

        let unread = monitor.notifications(10, true).unwrap();
        assert_eq!(unread.len(), 1);

        let view = monitor.notification_view(unread[0].id).unwrap();
        assert_eq!(view.plant.as_deref(), Some("Tomato"));
        assert_eq!(view.local_name.as_deref(), Some("Kamatis"));
        assert_eq!(view.sensor, "Soil Moisture");
        assert_eq!(view.recommendation, "Water the plant");

        let read = monitor.mark_notification_read(unread[0].id).unwrap();
        assert!(read.is_read);
        assert!(read.read_at.is_some());
        assert!(monitor.notifications(10, true).unwrap().is_empty());

        let err = monitor.mark_notification_read(NotificationId::new()).unwrap_err();
        assert!(matches!(err, MonitorError::Execution(ExecutionError::NotificationNotFound { .. })));
    }

    #[test]
    fn test_statistics_window_past_time_range() {
        let monitor = monitor();
        monitor.evaluate_reading(PlantId::new(7), 50.0, 24.0, 70.0);

        let window = chrono::Duration::try_hours(10_000_000_000).unwrap();
        let stats = monitor.sensor_statistics(window).unwrap();
        assert_eq!(stats.since, DateTime::<Utc>::MIN_UTC);
        assert_eq!(stats.reading_count, 1);

        let stats = monitor.sensor_statistics(chrono::Duration::MAX).unwrap();
        assert_eq!(stats.reading_count, 1);
    }

    #[test]
    fn test_statistics_rejects_negative_window() {
        let monitor = monitor();
        let err = monitor.sensor_statistics(chrono::Duration::hours(-1)).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("must not be negative"));
    }

    #[test]
    fn test_activate_unknown_profile() {
        let monitor = monitor();
        let err = monitor.activate(PlantId::new(99)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NoActiveProfile);
    }
}
