//! Monitor configuration.

use serde::{Deserialize, Serialize};

use crate::channel::{Channel, PhysicalLimits};
use crate::error::{MonitorError, MonitorResult, ValidationError};

/// Configuration for [`crate::monitor::PlantMonitor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Extra attempts after a stale-read rejection from the reading log.
    pub max_conflict_retries: u32,
    /// Per-subscriber notification feed buffer capacity.
    pub feed_capacity: usize,
    /// Physically plausible bounds; samples outside are rejected.
    pub limits: PhysicalLimits,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_conflict_retries: 3,
            feed_capacity: 256,
            limits: PhysicalLimits::default(),
        }
    }
}

impl MonitorConfig {
    /// Validates the configuration.
    pub fn validate(self) -> MonitorResult<Self> {
        if self.feed_capacity == 0 {
            return Err(invalid("feed_capacity must be at least 1"));
        }
        for channel in Channel::ALL {
            if !self.limits.for_channel(channel).is_well_formed() {
                return Err(invalid(&format!("physical limits for {channel} are malformed")));
            }
        }
        Ok(self)
    }
}

/// Configuration for [`crate::monitor::IngestRuntime`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestRuntimeConfig {
    /// Number of worker threads. Each plant is pinned to one worker.
    pub workers: usize,
    /// Maximum queued jobs per worker.
    pub queue_capacity: usize,
}

impl Default for IngestRuntimeConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
        }
    }
}

impl IngestRuntimeConfig {
    /// Validates the configuration.
    pub fn validate(self) -> MonitorResult<Self> {
        if self.workers == 0 {
            return Err(invalid("workers must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("queue_capacity must be at least 1"));
        }
        Ok(self)
    }
}

fn invalid(reason: &str) -> MonitorError {
    MonitorError::Validation(ValidationError::InvalidConfig {
        reason: reason.to_string(),
    })
}
