//! Sensor channels and their physical limits.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One monitored sensor dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Volumetric soil moisture, percent.
    SoilMoisture,
    /// Air temperature, degrees Celsius.
    Temperature,
    /// Relative humidity, percent.
    Humidity,
}

impl Channel {
    /// All channels in evaluation order.
    pub const ALL: [Self; 3] = [Self::SoilMoisture, Self::Temperature, Self::Humidity];

    /// Human-readable label used in notification messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::SoilMoisture => "Soil Moisture",
            Self::Temperature => "Temperature",
            Self::Humidity => "Humidity",
        }
    }

    /// Stable sensor-type key stored with notifications.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::SoilMoisture => "soil_moisture",
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
        }
    }

    /// Unit suffix appended to range strings.
    #[must_use]
    pub const fn unit(&self) -> &'static str {
        match self {
            Self::SoilMoisture | Self::Humidity => "%",
            Self::Temperature => "°C",
        }
    }

    /// Parses a sensor-type key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "soil_moisture" => Some(Self::SoilMoisture),
            "temperature" => Some(Self::Temperature),
            "humidity" => Some(Self::Humidity),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive numeric bounds `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lowest accepted value.
    pub min: f64,
    /// Highest accepted value.
    pub max: f64,
}

impl Bounds {
    /// Creates bounds without validation.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true when both ends are finite and `min <= max`.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Returns true when `value` lies inside the bounds, ends included.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Midpoint of the bounds.
    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    /// Formats the bounds as `min–max` followed by the channel unit, e.g. `40–60%`.
    #[must_use]
    pub fn format_for(&self, channel: Channel) -> String {
        format!("{}–{}{}", self.min, self.max, channel.unit())
    }
}

/// Physically plausible bounds per channel.
///
/// Values outside these limits indicate a faulty sensor or a corrupt upload
/// and are rejected before any threshold comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalLimits {
    /// Soil moisture limits.
    pub soil_moisture: Bounds,
    /// Temperature limits.
    pub temperature: Bounds,
    /// Humidity limits.
    pub humidity: Bounds,
}

impl Default for PhysicalLimits {
    fn default() -> Self {
        Self {
            soil_moisture: Bounds::new(0.0, 100.0),
            temperature: Bounds::new(-50.0, 100.0),
            humidity: Bounds::new(0.0, 100.0),
        }
    }
}

impl PhysicalLimits {
    /// Limits for one channel.
    #[must_use]
    pub const fn for_channel(&self, channel: Channel) -> Bounds {
        match channel {
            Channel::SoilMoisture => self.soil_moisture,
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
        }
    }
}
