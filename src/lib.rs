//! # plantwatch - Threshold-violation monitoring for plant sensors
//!
//! plantwatch ingests periodic soil moisture, temperature and humidity
//! readings for a monitored plant, compares them against that plant's safe
//! ranges, and raises graduated alerts when conditions stay out of range.
//!
//! ## Core Concepts
//!
//! - **PlantProfile**: accepted range per channel, a warning trigger, and a suggested action
//! - **Reading**: one evaluated sample together with the consecutive-violation counter
//! - **Violation**: a channel below its minimum or above its maximum
//! - **Notification**: raised once per violated channel when the counter reaches the trigger
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plantwatch::{MonitorConfig, PlantId, PlantMonitor, PlantProfile};
//! use plantwatch::storage::InMemoryStores;
//!
//! let stores = InMemoryStores::default();
//! let monitor = PlantMonitor::new(
//!     Arc::new(stores.profiles),
//!     Arc::new(stores.readings),
//!     Arc::new(stores.notifications),
//!     MonitorConfig::default(),
//! )?;
//!
//! monitor.register_profile(
//!     PlantProfile::builder()
//!         .id(1)
//!         .name("Tomato")
//!         .soil_moisture(40.0, 60.0)
//!         .temperature(20.0, 28.0)
//!         .humidity(60.0, 80.0)
//!         .warning_trigger(3)
//!         .build()?,
//! )?;
//! monitor.activate(PlantId::new(1))?;
//!
//! let result = monitor.evaluate_reading(PlantId::new(1), 30.0, 24.0, 70.0);
//! assert_eq!(result.warning_level, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod channel;
pub mod config;
pub mod error;
pub mod notification;
pub mod profile;
pub mod reading;

// Evaluation, storage and orchestration
pub mod monitor;
pub mod storage;
pub mod threshold;

// Re-export primary types at crate root for convenience
pub use channel::{Bounds, Channel, PhysicalLimits};
pub use config::{IngestRuntimeConfig, MonitorConfig};
pub use error::{ExecutionError, FailureKind, MonitorError, MonitorResult, ValidationError};
pub use notification::{Notification, NotificationId, NotificationView};
pub use profile::{PlantId, PlantProfile, PlantProfileBuilder};
pub use reading::{Reading, ReadingId, SensorSample};

pub use monitor::{
    EvaluationResult, IngestHandle, IngestRuntime, NotificationStream, PlantMonitor, SensorStatistics,
};
pub use storage::{NotificationStore, ProfileStore, ReadingLog, StorageError};
pub use threshold::{AlertState, ChannelStatus, Direction, Evaluation, Violation};
