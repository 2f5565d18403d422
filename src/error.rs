//! Error types for plantwatch.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! specific conditions. At the monitor boundary every error collapses into a
//! [`FailureKind`] plus a human-readable message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::channel::Channel;
use crate::notification::NotificationId;
use crate::profile::PlantId;
use crate::storage::StorageError;

/// Validation errors that occur during input validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{channel} value is not a finite number")]
    NonFiniteValue {
        channel: Channel,
    },

    #[error("{channel} value {value} is outside the physical range [{min}, {max}]")]
    ValueOutOfPhysicalRange {
        channel: Channel,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{channel} range is invalid: min {min} must not exceed max {max}")]
    InvalidRange {
        channel: Channel,
        min: f64,
        max: f64,
    },

    #[error("Warning trigger must be at least 1")]
    ZeroWarningTrigger,

    #[error("Plant name cannot be empty")]
    EmptyPlantName,

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Plant {requested} is not the active plant (active: {active})")]
    PlantNotActive {
        requested: PlantId,
        active: PlantId,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Execution errors that occur while evaluating or persisting readings.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("No active plant profile is configured")]
    NoActiveProfile,

    #[error("Plant profile not found: {id}")]
    ProfileNotFound {
        id: PlantId,
    },

    #[error("Notification not found: {id}")]
    NotificationNotFound {
        id: NotificationId,
    },

    #[error("Persistence failed: {message}")]
    Persistence {
        message: String,
    },

    #[error("Concurrent update conflict for plant {plant_id} after {attempts} attempt(s)")]
    ConcurrentUpdate {
        plant_id: PlantId,
        attempts: u32,
    },

    #[error("Queue full: {path} (capacity: {capacity})")]
    QueueFull {
        path: String,
        capacity: usize,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },
}

/// Top-level error type for plantwatch.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl From<StorageError> for MonitorError {
    fn from(err: StorageError) -> Self {
        Self::Execution(ExecutionError::Persistence {
            message: err.to_string(),
        })
    }
}

/// Machine-readable failure classification surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoActiveProfile,
    InvalidReadingValue,
    PersistenceFailure,
    ConcurrentUpdateConflict,
    Unavailable,
    Internal,
}

impl FailureKind {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NoActiveProfile => "no_active_profile",
            Self::InvalidReadingValue => "invalid_reading_value",
            Self::PersistenceFailure => "persistence_failure",
            Self::ConcurrentUpdateConflict => "concurrent_update_conflict",
            Self::Unavailable => "unavailable",
            Self::Internal => "internal",
        }
    }
}

impl MonitorError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if retrying the whole evaluation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Execution(e) => matches!(
                e,
                ExecutionError::ConcurrentUpdate { .. }
                    | ExecutionError::QueueFull { .. }
                    | ExecutionError::Timeout { .. }
            ),
            Self::Internal { .. } => false,
        }
    }

    /// Classifies this error for the evaluation boundary.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Validation(_) => FailureKind::InvalidReadingValue,
            Self::Execution(e) => match e {
                ExecutionError::NoActiveProfile | ExecutionError::ProfileNotFound { .. } => {
                    FailureKind::NoActiveProfile
                }
                ExecutionError::Persistence { .. } | ExecutionError::NotificationNotFound { .. } => {
                    FailureKind::PersistenceFailure
                }
                ExecutionError::ConcurrentUpdate { .. } => FailureKind::ConcurrentUpdateConflict,
                ExecutionError::QueueFull { .. }
                | ExecutionError::Disconnected { .. }
                | ExecutionError::Timeout { .. } => FailureKind::Unavailable,
            },
            Self::Internal { .. } => FailureKind::Internal,
        }
    }
}

/// Result type alias for plantwatch operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
