use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};

use plantwatch::storage::{
    InMemoryProfileStore, InMemoryReadingLog, InMemoryStores, NotificationStore, ReadingLog, StorageError,
};
use plantwatch::{
    AlertState, Channel, Direction, FailureKind, MonitorConfig, Notification, PlantId, PlantMonitor, PlantProfile,
    Reading, ReadingId, SensorSample,
};

const PLANT: PlantId = PlantId::new(1);

fn tomato(trigger: u32) -> PlantProfile {
    PlantProfile::builder()
        .id(1)
        .name("Tomato")
        .local_name("Kamatis")
        .soil_moisture(40.0, 60.0)
        .temperature(20.0, 28.0)
        .humidity(60.0, 80.0)
        .warning_trigger(trigger)
        .suggested_action("Water deeply and mulch")
        .build()
        .unwrap()
}

fn monitor_with(
    readings: Arc<dyn ReadingLog>,
    notifications: Arc<dyn NotificationStore>,
    config: MonitorConfig,
    trigger: u32,
) -> PlantMonitor {
    let monitor = PlantMonitor::new(Arc::new(InMemoryProfileStore::new()), readings, notifications, config).unwrap();
    monitor.register_profile(tomato(trigger)).unwrap();
    monitor.activate(PLANT).unwrap();
    monitor
}

fn monitor(trigger: u32) -> PlantMonitor {
    let stores = InMemoryStores::default();
    monitor_with(
        Arc::new(stores.readings),
        Arc::new(stores.notifications),
        MonitorConfig::default(),
        trigger,
    )
}

#[test]
fn example_scenario_fires_once_then_resets_and_fans_out() {
    let monitor = monitor(3);

    let first = monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0);
    let second = monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0);
    assert!(first.success && second.success);
    assert_eq!((first.warning_level, second.warning_level), (1, 2));
    assert!(!first.notification_triggered && !second.notification_triggered);
    assert_eq!(second.alert_state, Some(AlertState::Accumulating));

    let third = monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0);
    assert_eq!(third.warning_level, 3);
    assert!(third.notification_triggered);
    assert_eq!(third.current_violation_count, 1);
    assert_eq!(third.violations[0].channel, Channel::SoilMoisture);
    assert_eq!(third.violations[0].direction, Direction::BelowMinimum);

    let notes = monitor.notifications(10, false).unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].required_range, "40–60%");
    assert_eq!(
        notes[0].message,
        "Tomato Soil Moisture is Below Minimum. Current value: 30, Required range: 40–60%"
    );
    assert_eq!(notes[0].suggested_action, "Water deeply and mulch");
    assert_eq!(notes[0].level, 3);

    let fourth = monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0);
    assert_eq!(fourth.warning_level, 4);
    assert!(!fourth.notification_triggered);
    assert_eq!(fourth.alert_state, Some(AlertState::Elevated));

    let clean = monitor.evaluate_reading(PLANT, 50.0, 24.0, 70.0);
    assert_eq!(clean.warning_level, 0);
    assert!(clean.violations.is_empty());
    assert_eq!(clean.alert_state, Some(AlertState::Clean));

    let mut last = None;
    for _ in 0..3 {
        last = Some(monitor.evaluate_reading(PLANT, 30.0, 35.0, 70.0));
    }
    let last = last.unwrap();
    assert_eq!(last.warning_level, 3);
    assert_eq!(last.current_violation_count, 2);
    assert_eq!(last.notification_ids.len(), 2);

    let notes = monitor.notifications(10, false).unwrap();
    assert_eq!(notes.len(), 3);
    let temp = notes.iter().find(|n| n.channel == Channel::Temperature).unwrap();
    assert_eq!(temp.direction, Direction::AboveMaximum);
    assert_eq!(temp.required_range, "20–28°C");
    assert!(temp.message.starts_with("Tomato Temperature is Above Maximum. Current value: 35"));
}

#[test]
fn boundary_values_are_in_range() {
    let monitor = monitor(1);
    let result = monitor.evaluate_reading(PLANT, 40.0, 28.0, 60.0);
    assert!(result.success);
    assert_eq!(result.warning_level, 0);
    assert!(!result.notification_triggered);
}

#[test]
fn trigger_of_one_fires_on_first_violation() {
    let monitor = monitor(1);
    let result = monitor.evaluate_reading(PLANT, 50.0, 24.0, 95.0);
    assert!(result.notification_triggered);
    assert_eq!(result.alert_state, Some(AlertState::Triggered));
    assert_eq!(monitor.notifications(10, true).unwrap()[0].channel, Channel::Humidity);
}

#[test]
fn evaluate_active_uses_active_plant() {
    let monitor = monitor(3);
    let result = monitor.evaluate_active(SensorSample::new(30.0, 24.0, 70.0));
    assert_eq!(result.plant_id, Some(PLANT));
    assert_eq!(result.warning_level, 1);
}

#[test]
fn subscribers_see_committed_notifications() {
    let monitor = monitor(2);
    let stream = monitor.subscribe().unwrap();

    monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0);
    assert!(stream.drain().is_empty());

    let fired = monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0);
    let received = stream.recv_timeout(Duration::from_millis(100)).unwrap();
    assert_eq!(fired.notification_ids, vec![received.id]);
}

#[test]
fn statistics_cover_recent_readings() {
    let monitor = monitor(3);
    monitor.evaluate_reading(PLANT, 40.0, 20.0, 60.0);
    monitor.evaluate_reading(PLANT, 60.0, 30.0, 80.0);

    let stats = monitor.sensor_statistics(chrono::Duration::hours(1)).unwrap();
    assert_eq!(stats.reading_count, 2);
    assert_eq!(stats.avg_soil_moisture, Some(50.0));
    assert_eq!(stats.min_temperature, Some(20.0));
    assert_eq!(stats.max_temperature, Some(30.0));

    let readings = monitor.latest_readings(1).unwrap();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].sample.soil_moisture, 60.0);
}

// --- Failure handling ---

/// Reading log whose commits fail, either all of them or only those that
/// carry notifications.
struct FailingLog {
    inner: InMemoryReadingLog,
    only_with_notifications: bool,
    reason: &'static str,
}

impl FailingLog {
    fn new(only_with_notifications: bool, reason: &'static str) -> Self {
        Self {
            inner: InMemoryReadingLog::new(),
            only_with_notifications,
            reason,
        }
    }
}

impl ReadingLog for FailingLog {
    fn latest(&self, plant_id: PlantId) -> Result<Option<Reading>, StorageError> {
        self.inner.latest(plant_id)
    }
    fn append_with_notifications(
        &self,
        reading: Reading,
        expected_prior: Option<ReadingId>,
        notifications: Vec<Notification>,
    ) -> Result<ReadingId, StorageError> {
        if !self.only_with_notifications || !notifications.is_empty() {
            return Err(StorageError::BackendError(self.reason.to_string()));
        }
        self.inner.append_with_notifications(reading, expected_prior, notifications)
    }
    fn get(&self, id: ReadingId) -> Result<Option<Reading>, StorageError> {
        self.inner.get(id)
    }
    fn recent(&self, limit: usize) -> Result<Vec<Reading>, StorageError> {
        self.inner.recent(limit)
    }
    fn since(&self, since: DateTime<Utc>) -> Result<Vec<Reading>, StorageError> {
        self.inner.since(since)
    }
    fn count_for_plant(&self, plant_id: PlantId) -> Result<usize, StorageError> {
        self.inner.count_for_plant(plant_id)
    }
}

#[test]
fn failed_triggering_commit_records_nothing() {
    let log = Arc::new(FailingLog::new(true, "disk full"));
    let notifications = Arc::new(log.inner.notifications());
    let monitor = monitor_with(log.clone(), notifications.clone(), MonitorConfig::default(), 2);

    assert_eq!(monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0).warning_level, 1);

    let result = monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0);
    assert!(!result.success);
    assert!(result.failed_with(FailureKind::PersistenceFailure));
    assert!(result.message.contains("disk full"));

    // Neither the reading nor its notification landed, so the counter did not advance.
    assert_eq!(log.count_for_plant(PLANT).unwrap(), 1);
    assert_eq!(log.latest(PLANT).unwrap().unwrap().warning_level, 1);
    assert!(notifications.list(10, false).unwrap().is_empty());
}

#[test]
fn failed_reading_write_records_nothing() {
    let log = Arc::new(FailingLog::new(false, "read-only filesystem"));
    let notifications = Arc::new(log.inner.notifications());
    let monitor = monitor_with(log.clone(), notifications.clone(), MonitorConfig::default(), 1);

    let result = monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0);
    assert!(result.failed_with(FailureKind::PersistenceFailure));
    assert!(result.message.contains("read-only filesystem"));
    assert_eq!(log.count_for_plant(PLANT).unwrap(), 0);
    assert!(notifications.list(10, false).unwrap().is_empty());
}

/// Reading log shared with a simulated second writer that slips a reading in
/// just before each of the monitor's next `races` appends.
struct RacingLog {
    inner: InMemoryReadingLog,
    races: AtomicU32,
}

impl RacingLog {
    fn new(races: u32) -> Self {
        Self {
            inner: InMemoryReadingLog::new(),
            races: AtomicU32::new(races),
        }
    }
}

impl ReadingLog for RacingLog {
    fn latest(&self, plant_id: PlantId) -> Result<Option<Reading>, StorageError> {
        self.inner.latest(plant_id)
    }
    fn append_with_notifications(
        &self,
        reading: Reading,
        expected_prior: Option<ReadingId>,
        notifications: Vec<Notification>,
    ) -> Result<ReadingId, StorageError> {
        let raced = self
            .races
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if raced {
            let foreign = Reading::new(reading.plant_id, SensorSample::new(30.0, 24.0, 70.0), 5);
            self.inner.append(foreign, expected_prior)?;
        }
        self.inner.append_with_notifications(reading, expected_prior, notifications)
    }
    fn get(&self, id: ReadingId) -> Result<Option<Reading>, StorageError> {
        self.inner.get(id)
    }
    fn recent(&self, limit: usize) -> Result<Vec<Reading>, StorageError> {
        self.inner.recent(limit)
    }
    fn since(&self, since: DateTime<Utc>) -> Result<Vec<Reading>, StorageError> {
        self.inner.since(since)
    }
    fn count_for_plant(&self, plant_id: PlantId) -> Result<usize, StorageError> {
        self.inner.count_for_plant(plant_id)
    }
}

#[test]
fn conflict_is_retried_from_new_prior() {
    let log = Arc::new(RacingLog::new(1));
    let monitor = monitor_with(
        log.clone(),
        Arc::new(log.inner.notifications()),
        MonitorConfig::default(),
        10,
    );

    let result = monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0);
    assert!(result.success);
    // Counted on top of the other writer's level 5.
    assert_eq!(result.warning_level, 6);
    assert_eq!(log.count_for_plant(PLANT).unwrap(), 2);
}

#[test]
fn conflict_exhausts_retries() {
    let log = Arc::new(RacingLog::new(100));
    let config = MonitorConfig {
        max_conflict_retries: 2,
        ..MonitorConfig::default()
    };
    let monitor = monitor_with(log.clone(), Arc::new(log.inner.notifications()), config, 10);

    let result = monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0);
    assert!(result.failed_with(FailureKind::ConcurrentUpdateConflict));
    assert!(result.message.contains("3 attempt"));
    // Only the other writer's readings landed.
    assert_eq!(log.count_for_plant(PLANT).unwrap(), 3);
    assert!(log.recent(10).unwrap().iter().all(|r| r.warning_level == 5));
}

#[test]
fn concurrent_evaluations_serialize_per_plant() {
    const THREADS: u32 = 8;
    const PER_THREAD: u32 = 10;

    let stores = InMemoryStores::default();
    let readings = Arc::new(stores.readings);
    let notifications = Arc::new(stores.notifications);
    let monitor = Arc::new(monitor_with(
        readings.clone(),
        notifications.clone(),
        MonitorConfig::default(),
        THREADS * PER_THREAD / 2,
    ));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| monitor.evaluate_reading(PLANT, 30.0, 24.0, 70.0).warning_level)
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let levels: BTreeSet<u32> = workers
        .into_iter()
        .flat_map(|w| w.join().unwrap())
        .collect();

    assert_eq!(levels, (1..=THREADS * PER_THREAD).collect());
    assert_eq!(notifications.find_by_plant(PLANT).unwrap().len(), 1);
    assert_eq!(
        readings.latest(PLANT).unwrap().unwrap().warning_level,
        THREADS * PER_THREAD
    );
}
