//! Plant profiles: the accepted environmental ranges for one plant.
//!
//! Profiles are created and edited outside the monitor. The monitor only
//! reads the currently active profile and never mutates it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::{Bounds, Channel};
use crate::error::ValidationError;

/// Stable, externally assigned plant identifier.
///
/// # Examples
///
/// ```
/// use plantwatch::PlantId;
///
/// let id = PlantId::new(12);
/// assert_eq!(id.get(), 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlantId(u64);

impl PlantId {
    /// Wraps a raw plant id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PlantId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Accepted ranges and alerting policy for one plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantProfile {
    /// Plant identity.
    pub id: PlantId,
    /// Display name used in notification messages.
    pub name: String,
    /// Local or common name.
    #[serde(default)]
    pub local_name: String,
    /// Accepted soil moisture range, percent.
    pub soil_moisture: Bounds,
    /// Accepted temperature range, degrees Celsius.
    pub temperature: Bounds,
    /// Accepted humidity range, percent.
    pub humidity: Bounds,
    /// Consecutive violating readings required before a notification fires.
    pub warning_trigger: u32,
    /// Remediation text copied verbatim into notifications.
    #[serde(default)]
    pub suggested_action: String,
}

impl PlantProfile {
    /// Creates a new profile builder.
    #[must_use]
    pub fn builder() -> PlantProfileBuilder {
        PlantProfileBuilder::new()
    }

    /// The accepted range for a channel.
    #[must_use]
    pub const fn bounds(&self, channel: Channel) -> Bounds {
        match channel {
            Channel::SoilMoisture => self.soil_moisture,
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
        }
    }

    /// Checks the profile invariants: non-empty name, `min <= max` per
    /// channel, and a warning trigger of at least 1.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyPlantName);
        }
        for channel in Channel::ALL {
            let bounds = self.bounds(channel);
            if !bounds.is_well_formed() {
                return Err(ValidationError::InvalidRange {
                    channel,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        if self.warning_trigger == 0 {
            return Err(ValidationError::ZeroWarningTrigger);
        }
        Ok(())
    }
}

/// Builder for [`PlantProfile`].
#[derive(Debug, Default)]
pub struct PlantProfileBuilder {
    id: Option<PlantId>,
    name: Option<String>,
    local_name: Option<String>,
    soil_moisture: Option<Bounds>,
    temperature: Option<Bounds>,
    humidity: Option<Bounds>,
    warning_trigger: Option<u32>,
    suggested_action: Option<String>,
}

impl PlantProfileBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the plant id.
    #[must_use]
    pub fn id(mut self, id: impl Into<PlantId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the local or common name.
    #[must_use]
    pub fn local_name(mut self, local_name: impl Into<String>) -> Self {
        self.local_name = Some(local_name.into());
        self
    }

    /// Sets the soil moisture range.
    #[must_use]
    pub fn soil_moisture(mut self, min: f64, max: f64) -> Self {
        self.soil_moisture = Some(Bounds::new(min, max));
        self
    }

    /// Sets the temperature range.
    #[must_use]
    pub fn temperature(mut self, min: f64, max: f64) -> Self {
        self.temperature = Some(Bounds::new(min, max));
        self
    }

    /// Sets the humidity range.
    #[must_use]
    pub fn humidity(mut self, min: f64, max: f64) -> Self {
        self.humidity = Some(Bounds::new(min, max));
        self
    }

    /// Sets the warning trigger.
    #[must_use]
    pub fn warning_trigger(mut self, trigger: u32) -> Self {
        self.warning_trigger = Some(trigger);
        self
    }

    /// Sets the suggested action.
    #[must_use]
    pub fn suggested_action(mut self, action: impl Into<String>) -> Self {
        self.suggested_action = Some(action.into());
        self
    }

    /// Builds and validates the profile.
    pub fn build(self) -> Result<PlantProfile, ValidationError> {
        let missing = |field: &str| ValidationError::MissingField {
            field: field.to_string(),
        };

        let profile = PlantProfile {
            id: self.id.ok_or_else(|| missing("id"))?,
            name: self.name.ok_or_else(|| missing("name"))?,
            local_name: self.local_name.unwrap_or_default(),
            soil_moisture: self.soil_moisture.ok_or_else(|| missing("soil_moisture"))?,
            temperature: self.temperature.ok_or_else(|| missing("temperature"))?,
            humidity: self.humidity.ok_or_else(|| missing("humidity"))?,
            warning_trigger: self.warning_trigger.ok_or_else(|| missing("warning_trigger"))?,
            suggested_action: self.suggested_action.unwrap_or_default(),
        };
        profile.validate()?;
        Ok(profile)
    }
}
