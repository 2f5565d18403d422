//! Sensor samples and persisted readings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::{Channel, PhysicalLimits};
use crate::error::ValidationError;
use crate::profile::PlantId;

/// Opaque handle for a reading in the reading log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingId(Uuid);

impl ReadingId {
    /// Creates a new random reading id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReadingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One (soil moisture, temperature, humidity) triple delivered by ingest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Soil moisture, percent.
    pub soil_moisture: f64,
    /// Temperature, degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
}

impl SensorSample {
    /// Creates a sample.
    #[must_use]
    pub const fn new(soil_moisture: f64, temperature: f64, humidity: f64) -> Self {
        Self {
            soil_moisture,
            temperature,
            humidity,
        }
    }

    /// The observed value for a channel.
    #[must_use]
    pub const fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::SoilMoisture => self.soil_moisture,
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
        }
    }

    /// Rejects non-finite values and values outside the physical limits.
    pub fn validate(&self, limits: &PhysicalLimits) -> Result<(), ValidationError> {
        for channel in Channel::ALL {
            let value = self.value(channel);
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteValue { channel });
            }
            let bounds = limits.for_channel(channel);
            if !bounds.contains(value) {
                return Err(ValidationError::ValueOutOfPhysicalRange {
                    channel,
                    value,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }
}

/// A persisted reading with the consecutive-violation counter as of that reading.
///
/// Readings are immutable once written to the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Reading id.
    pub id: ReadingId,
    /// The plant this reading was evaluated against.
    pub plant_id: PlantId,
    /// Observed values.
    pub sample: SensorSample,
    /// Consecutive-violation counter after this reading (0 when clean).
    pub warning_level: u32,
    /// When the reading was recorded.
    pub recorded_at: DateTime<Utc>,
}

impl Reading {
    /// Creates a reading stamped with the current time.
    #[must_use]
    pub fn new(plant_id: PlantId, sample: SensorSample, warning_level: u32) -> Self {
        Self {
            id: ReadingId::new(),
            plant_id,
            sample,
            warning_level,
            recorded_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_limits() {
        let sample = SensorSample::new(30.0, 24.0, 70.0);
        assert!(sample.validate(&PhysicalLimits::default()).is_ok());
    }

    #[test]
    fn test_negative_humidity_rejected() {
        let sample = SensorSample::new(30.0, 24.0, -1.0);
        let err = sample.validate(&PhysicalLimits::default()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ValueOutOfPhysicalRange {
                channel: Channel::Humidity,
                ..
            }
        ));
    }

    #[test]
    fn test_nan_rejected() {
        let sample = SensorSample::new(f64::NAN, 24.0, 70.0);
        let err = sample.validate(&PhysicalLimits::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::NonFiniteValue {
                channel: Channel::SoilMoisture
            }
        );
    }

    #[test]
    fn test_physical_limit_edges_accepted() {
        let sample = SensorSample::new(0.0, -50.0, 100.0);
        assert!(sample.validate(&PhysicalLimits::default()).is_ok());
    }
}
