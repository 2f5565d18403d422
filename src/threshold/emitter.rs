//! Notification emission.
//!
//! A streak fires exactly once: on the reading whose counter equals the
//! profile's warning trigger.

use chrono::Utc;

use crate::notification::{Notification, NotificationId};
use crate::profile::PlantProfile;

use super::evaluator::Violation;

/// True iff a reading with this counter fires notifications.
#[must_use]
pub const fn should_fire(warning_level: u32, warning_trigger: u32) -> bool {
    warning_level != 0 && warning_level == warning_trigger
}

/// Builds the human-readable message for one violation.
#[must_use]
pub fn notification_message(profile: &PlantProfile, violation: &Violation) -> String {
    format!(
        "{} {} is {}. Current value: {}, Required range: {}",
        profile.name,
        violation.channel.label(),
        violation.direction.label(),
        violation.observed,
        violation.range_string(),
    )
}

/// Builds one notification per violation when the counter reaches the trigger.
///
/// Returns an empty list on every other reading.
#[must_use]
pub fn emit(profile: &PlantProfile, violations: &[Violation], warning_level: u32) -> Vec<Notification> {
    if !should_fire(warning_level, profile.warning_trigger) {
        return Vec::new();
    }

    let created_at = Utc::now();
    violations
        .iter()
        .map(|violation| Notification {
            id: NotificationId::new(),
            plant_id: profile.id,
            message: notification_message(profile, violation),
            channel: violation.channel,
            direction: violation.direction,
            level: warning_level,
            suggested_action: profile.suggested_action.clone(),
            observed: violation.observed,
            required_range: violation.range_string(),
            is_read: false,
            read_at: None,
            created_at,
        })
        .collect()
}
