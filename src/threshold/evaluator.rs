//! Per-channel threshold evaluation.
//!
//! Evaluation is a pure function of a sample and a profile: the same inputs
//! always produce the same violation set.

use serde::{Deserialize, Serialize};

use crate::channel::{Bounds, Channel};
use crate::error::ExecutionError;
use crate::profile::PlantProfile;
use crate::reading::SensorSample;

/// Which side of the accepted range a value fell on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Strictly below the minimum.
    BelowMinimum,
    /// Strictly above the maximum.
    AboveMaximum,
}

impl Direction {
    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::BelowMinimum => "Below Minimum",
            Self::AboveMaximum => "Above Maximum",
        }
    }
}

/// Status of one channel for one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Inside the accepted range, ends included.
    Ok,
    /// Below the minimum.
    BelowMinimum,
    /// Above the maximum.
    AboveMaximum,
}

impl ChannelStatus {
    /// Classifies a value against inclusive bounds.
    #[must_use]
    pub fn classify(value: f64, bounds: Bounds) -> Self {
        if value < bounds.min {
            Self::BelowMinimum
        } else if value > bounds.max {
            Self::AboveMaximum
        } else {
            Self::Ok
        }
    }

    /// The violation direction, if any.
    #[must_use]
    pub const fn direction(&self) -> Option<Direction> {
        match self {
            Self::Ok => None,
            Self::BelowMinimum => Some(Direction::BelowMinimum),
            Self::AboveMaximum => Some(Direction::AboveMaximum),
        }
    }
}

/// One channel outside its accepted range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Violated channel.
    pub channel: Channel,
    /// Side of the range.
    pub direction: Direction,
    /// Observed value.
    pub observed: f64,
    /// Accepted minimum.
    pub range_low: f64,
    /// Accepted maximum.
    pub range_high: f64,
}

impl Violation {
    /// The violated range.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        Bounds::new(self.range_low, self.range_high)
    }

    /// Formatted range string with unit, e.g. `40–60%`.
    #[must_use]
    pub fn range_string(&self) -> String {
        self.bounds().format_for(self.channel)
    }
}

/// Result of evaluating one sample against one profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Status of every channel, in [`Channel::ALL`] order.
    pub statuses: [(Channel, ChannelStatus); 3],
    /// Violations, in [`Channel::ALL`] order.
    pub violations: Vec<Violation>,
}

impl Evaluation {
    /// True iff at least one channel is out of range.
    #[must_use]
    pub fn has_violation(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Number of violated channels.
    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.violations.len()
    }

    /// Status of a single channel.
    #[must_use]
    pub fn status(&self, channel: Channel) -> ChannelStatus {
        self.statuses
            .iter()
            .find(|(c, _)| *c == channel)
            .map_or(ChannelStatus::Ok, |(_, s)| *s)
    }
}

/// Evaluates a sample against a profile.
#[must_use]
pub fn evaluate(sample: &SensorSample, profile: &PlantProfile) -> Evaluation {
    let mut violations = Vec::new();
    let statuses = Channel::ALL.map(|channel| {
        let bounds = profile.bounds(channel);
        let observed = sample.value(channel);
        let status = ChannelStatus::classify(observed, bounds);
        if let Some(direction) = status.direction() {
            violations.push(Violation {
                channel,
                direction,
                observed,
                range_low: bounds.min,
                range_high: bounds.max,
            });
        }
        (channel, status)
    });

    Evaluation {
        statuses,
        violations,
    }
}

/// Evaluates against an optional profile, refusing to evaluate without one.
pub fn try_evaluate(
    sample: &SensorSample,
    profile: Option<&PlantProfile>,
) -> Result<Evaluation, ExecutionError> {
    let profile = profile.ok_or(ExecutionError::NoActiveProfile)?;
    Ok(evaluate(sample, profile))
}
