//! Threshold evaluation, streak tracking and notification emission.
//!
//! These are the pure building blocks of the monitor. Orchestration,
//! locking and persistence live in [`crate::monitor`].

/// Notification emission at the warning trigger.
pub mod emitter;
/// Per-channel range checks.
pub mod evaluator;
/// Consecutive-violation counter.
pub mod tracker;

pub use emitter::{emit, notification_message, should_fire};
pub use evaluator::{evaluate, try_evaluate, ChannelStatus, Direction, Evaluation, Violation};
pub use tracker::{next_warning_level, AlertState};
