//! Structured evaluation outcome.

use serde::{Deserialize, Serialize};

use crate::error::{FailureKind, MonitorError};
use crate::notification::NotificationId;
use crate::profile::PlantId;
use crate::reading::ReadingId;
use crate::threshold::{AlertState, Violation};

/// Outcome of one `evaluate_reading` call.
///
/// Expected failures (no active profile, bad values, storage trouble,
/// unresolved conflicts) are reported here rather than as a panic or an
/// `Err`, so callers such as an HTTP handler can forward the result as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// True iff the reading (and any notifications) were recorded.
    pub success: bool,
    /// Plant the reading was recorded for.
    pub plant_id: Option<PlantId>,
    /// Id of the recorded reading.
    pub reading_id: Option<ReadingId>,
    /// Consecutive-violation counter after this reading.
    pub warning_level: u32,
    /// Number of channels out of range in this reading.
    pub current_violation_count: usize,
    /// Out-of-range channels in this reading.
    pub violations: Vec<Violation>,
    /// True iff this reading raised notifications.
    pub notification_triggered: bool,
    /// Ids of the notifications raised by this reading.
    pub notification_ids: Vec<NotificationId>,
    /// Alerting state after this reading.
    pub alert_state: Option<AlertState>,
    /// Human-readable summary.
    pub message: String,
    /// Failure classification when `success` is false.
    pub failure: Option<FailureKind>,
}

impl EvaluationResult {
    /// A failed evaluation. Nothing was recorded.
    #[must_use]
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            plant_id: None,
            reading_id: None,
            warning_level: 0,
            current_violation_count: 0,
            violations: Vec::new(),
            notification_triggered: false,
            notification_ids: Vec::new(),
            alert_state: None,
            message: message.into(),
            failure: Some(kind),
        }
    }

    /// True iff the evaluation failed with `kind`.
    #[must_use]
    pub fn failed_with(&self, kind: FailureKind) -> bool {
        self.failure == Some(kind)
    }
}

impl From<&MonitorError> for EvaluationResult {
    fn from(err: &MonitorError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }
}

impl From<MonitorError> for EvaluationResult {
    fn from(err: MonitorError) -> Self {
        Self::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionError;

    #[test]
    fn test_failure_from_error() {
        let result = EvaluationResult::from(MonitorError::from(ExecutionError::NoActiveProfile));
        assert!(!result.success);
        assert!(result.failed_with(FailureKind::NoActiveProfile));
        assert!(result.reading_id.is_none());
        assert!(result.message.contains("No active plant profile"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let result = EvaluationResult::failure(FailureKind::InvalidReadingValue, "bad");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["notificationTriggered"], false);
        assert_eq!(json["failure"], "invalid_reading_value");
    }
}
