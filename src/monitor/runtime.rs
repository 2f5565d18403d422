//! Sharded ingest runtime.
//!
//! Readings often arrive from many sensors at once. This runtime runs a fixed
//! pool of worker threads, each with its own bounded queue, and pins every
//! plant to one worker by id. A plant's readings are therefore evaluated in
//! submission order by a single thread, while different plants spread across
//! the pool.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::debug;

use crate::config::IngestRuntimeConfig;
use crate::error::{ExecutionError, MonitorError, MonitorResult};
use crate::profile::PlantId;
use crate::reading::SensorSample;

use super::{EvaluationResult, PlantMonitor};

enum Job {
    Evaluate {
        plant_id: PlantId,
        sample: SensorSample,
        reply: Sender<EvaluationResult>,
    },

    #[cfg(test)]
    Sleep {
        duration: Duration,
        reply: Sender<()>,
    },
}

struct Shard {
    name: String,
    tx: Sender<Job>,
    worker: JoinHandle<()>,
}

impl Shard {
    fn start(idx: usize, queue_capacity: usize, monitor: Arc<PlantMonitor>) -> MonitorResult<Self> {
        let (tx, rx) = bounded::<Job>(queue_capacity);
        let name = format!("plantwatch-ingest-{idx}");
        let worker = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(&rx, &monitor))
            .map_err(|e| MonitorError::internal(format!("failed to spawn {name}: {e}")))?;
        Ok(Self { name, tx, worker })
    }
}

fn worker_loop(rx: &Receiver<Job>, monitor: &PlantMonitor) {
    loop {
        match rx.recv() {
            Ok(Job::Evaluate {
                plant_id,
                sample,
                reply,
            }) => {
                let result = monitor.evaluate_reading(
                    plant_id,
                    sample.soil_moisture,
                    sample.temperature,
                    sample.humidity,
                );
                let _ = reply.send(result);
            }
            Err(_) => break,

            #[cfg(test)]
            Ok(Job::Sleep { duration, reply }) => {
                thread::sleep(duration);
                let _ = reply.send(());
            }
        }
    }
}

/// Handle returned by [`IngestRuntime::submit`].
#[derive(Debug)]
pub struct IngestHandle {
    shard: String,
    rx: Receiver<EvaluationResult>,
}

impl IngestHandle {
    /// Name of the worker the job was routed to.
    #[must_use]
    pub fn shard(&self) -> &str {
        &self.shard
    }

    /// Waits for the evaluation to complete.
    pub fn join(self) -> MonitorResult<EvaluationResult> {
        self.rx
            .recv()
            .map_err(|_| ExecutionError::Disconnected { path: self.shard }.into())
    }

    /// Waits for the evaluation to complete with a timeout.
    pub fn join_timeout(self, timeout: Duration) -> MonitorResult<EvaluationResult> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }
            .into(),
            RecvTimeoutError::Disconnected => ExecutionError::Disconnected { path: self.shard }.into(),
        })
    }
}

/// Worker pool that evaluates readings with per-plant ordering.
pub struct IngestRuntime {
    monitor: Arc<PlantMonitor>,
    shards: Vec<Shard>,
    queue_capacity: usize,
}

impl std::fmt::Debug for IngestRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestRuntime")
            .field("workers", &self.shards.len())
            .field("queue_capacity", &self.queue_capacity)
            .finish_non_exhaustive()
    }
}

impl IngestRuntime {
    /// Starts the workers.
    pub fn new(monitor: Arc<PlantMonitor>, config: IngestRuntimeConfig) -> MonitorResult<Self> {
        let config = config.validate()?;
        let shards = (0..config.workers)
            .map(|idx| Shard::start(idx, config.queue_capacity, Arc::clone(&monitor)))
            .collect::<MonitorResult<Vec<_>>>()?;
        debug!(workers = config.workers, queue_capacity = config.queue_capacity, "started ingest runtime");
        Ok(Self {
            monitor,
            shards,
            queue_capacity: config.queue_capacity,
        })
    }

    fn shard_for(&self, plant_id: PlantId) -> &Shard {
        let len = self.shards.len() as u64;
        #[allow(clippy::cast_possible_truncation)]
        let idx = (plant_id.get() % len) as usize;
        &self.shards[idx]
    }

    fn try_submit(&self, shard: &Shard, job: Job) -> MonitorResult<()> {
        match shard.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ExecutionError::QueueFull {
                path: shard.name.clone(),
                capacity: self.queue_capacity,
            }
            .into()),
            Err(TrySendError::Disconnected(_)) => Err(ExecutionError::Disconnected {
                path: shard.name.clone(),
            }
            .into()),
        }
    }

    /// Queues a reading for evaluation without blocking.
    ///
    /// Fails with `QueueFull` when the plant's worker is backed up.
    pub fn submit(&self, plant_id: PlantId, sample: SensorSample) -> MonitorResult<IngestHandle> {
        let shard = self.shard_for(plant_id);
        let (reply, rx) = bounded::<EvaluationResult>(1);
        self.try_submit(
            shard,
            Job::Evaluate {
                plant_id,
                sample,
                reply,
            },
        )?;
        Ok(IngestHandle {
            shard: shard.name.clone(),
            rx,
        })
    }

    /// Queues a reading and waits for its result.
    pub fn evaluate(&self, plant_id: PlantId, sample: SensorSample) -> MonitorResult<EvaluationResult> {
        self.submit(plant_id, sample)?.join()
    }

    /// The monitor the workers evaluate against.
    #[must_use]
    pub fn monitor(&self) -> &PlantMonitor {
        &self.monitor
    }

    #[cfg(test)]
    fn submit_sleep(&self, plant_id: PlantId, duration: Duration) -> MonitorResult<Receiver<()>> {
        let (reply, rx) = bounded::<()>(1);
        self.try_submit(self.shard_for(plant_id), Job::Sleep { duration, reply })?;
        Ok(rx)
    }
}

impl Drop for IngestRuntime {
    fn drop(&mut self) {
        // Closing each queue lets its worker drain what is queued and exit.
        for shard in std::mem::take(&mut self.shards) {
            drop(shard.tx);
            let _ = shard.worker.join();
        }
    }
}
