//! Consecutive-violation counter.
//!
//! The counter is never held in memory between readings: it is derived from
//! the plant's most recent persisted reading on every evaluation.

use serde::{Deserialize, Serialize};

use crate::reading::Reading;

/// Computes the counter for a new reading.
///
/// A violating reading extends the streak by one; a clean reading resets it
/// to zero. Without a prior reading the streak starts from zero.
#[must_use]
pub fn next_warning_level(prior: Option<&Reading>, has_violation: bool) -> u32 {
    if !has_violation {
        return 0;
    }
    prior.map_or(0, |r| r.warning_level).saturating_add(1)
}

/// Alerting state of a plant, derived from its counter and trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// Counter is zero.
    Clean,
    /// Violating, but below the trigger.
    Accumulating,
    /// Counter just reached the trigger; notifications fire here.
    Triggered,
    /// Past the trigger; no further notifications this streak.
    Elevated,
}

impl AlertState {
    /// Derives the state from a counter value.
    #[must_use]
    pub fn from_level(level: u32, warning_trigger: u32) -> Self {
        if level == 0 {
            Self::Clean
        } else if level < warning_trigger {
            Self::Accumulating
        } else if level == warning_trigger {
            Self::Triggered
        } else {
            Self::Elevated
        }
    }
}
