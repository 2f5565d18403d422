//! Notifications raised when a violation streak reaches a plant's warning trigger.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::Channel;
use crate::profile::{PlantId, PlantProfile};
use crate::threshold::Direction;

/// Unique identifier for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Creates a new random notification id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored notification.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub plant_id: PlantId,
    pub message: String,
    pub channel: Channel,
    pub direction: Direction,
    /// Counter value that triggered this notification.
    pub level: u32,
    /// Copied from the profile at emission time.
    pub suggested_action: String,
    pub observed: f64,
    /// Formatted accepted range, e.g. `40–60%`.
    pub required_range: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Marks the notification read. Returns false if it already was.
    pub fn mark_read(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(at);
        true
    }

    /// Builds the presentation-neutral view, joining the owning profile's names.
    #[must_use]
    pub fn view(&self, profile: Option<&PlantProfile>) -> NotificationView {
        NotificationView {
            id: self.id,
            plant: profile.map(|p| p.name.clone()),
            local_name: profile.map(|p| p.local_name.clone()),
            sensor: self.channel.label().to_string(),
            status: self.direction.label().to_string(),
            current_value: self.observed,
            required_range: self.required_range.clone(),
            recommendation: self.suggested_action.clone(),
            warning_level: self.level,
            is_read: self.is_read,
            timestamp: self.created_at,
        }
    }
}

/// Flattened notification for dashboards and other readers.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: NotificationId,
    pub plant: Option<String>,
    pub local_name: Option<String>,
    pub sensor: String,
    pub status: String,
    pub current_value: f64,
    pub required_range: String,
    pub recommendation: String,
    pub warning_level: u32,
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
}
