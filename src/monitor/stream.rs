//! In-process notification feed.
//!
//! Subscribers receive notifications after they are committed. Publishing
//! never blocks the evaluating thread: a full subscriber buffer drops the
//! notification for that subscriber and bumps a counter, and a dropped
//! stream is pruned on the next publish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use crate::error::{ExecutionError, MonitorError, MonitorResult};
use crate::notification::Notification;

const STREAM_PATH: &str = "notification_stream";

/// Fan-out registry of subscriber channels.
#[derive(Debug)]
pub struct NotificationFeed {
    capacity: usize,
    subscribers: Mutex<Vec<Sender<Notification>>>,
    dropped: AtomicU64,
}

impl NotificationFeed {
    /// Creates a feed whose subscribers each buffer up to `capacity` notifications.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> MonitorResult<NotificationStream> {
        let (tx, rx) = bounded(self.capacity);
        self.subscribers
            .lock()
            .map_err(|_| MonitorError::internal("poisoned lock: feed.subscribers"))?
            .push(tx);
        Ok(NotificationStream { rx })
    }

    /// Delivers each notification to every live subscriber without blocking.
    pub fn publish(&self, notifications: &[Notification]) {
        if notifications.is_empty() {
            return;
        }
        let Ok(mut subscribers) = self.subscribers.lock() else {
            self.dropped
                .fetch_add(notifications.len() as u64, Ordering::Relaxed);
            return;
        };

        subscribers.retain(|tx| {
            for n in notifications {
                match tx.try_send(n.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(TrySendError::Disconnected(_)) => return false,
                }
            }
            true
        });
    }

    /// Notifications dropped because a subscriber's buffer was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of registered subscribers (including ones not yet pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map_or(0, |s| s.len())
    }
}

/// Receiving end of a feed subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct NotificationStream {
    rx: Receiver<Notification>,
}

impl NotificationStream {
    /// Receive the next notification (blocking).
    pub fn recv(&self) -> MonitorResult<Notification> {
        self.rx.recv().map_err(|_| {
            MonitorError::Execution(ExecutionError::Disconnected {
                path: STREAM_PATH.to_string(),
            })
        })
    }

    /// Receive the next notification with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> MonitorResult<Notification> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => MonitorError::Execution(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => MonitorError::Execution(ExecutionError::Disconnected {
                path: STREAM_PATH.to_string(),
            }),
        })
    }

    /// Drains everything currently buffered.
    pub fn drain(&self) -> Vec<Notification> {
        self.rx.try_iter().collect()
    }
}
