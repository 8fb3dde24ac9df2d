//! Sync worker
//!
//! Pops sync jobs off the durable queue and executes them, holding a
//! per-device lock for the duration of each job.

mod locks;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::db::JobQueue;
use crate::device::DeviceConnector;
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::executor::{JobOutcome, SyncExecutor};
use crate::jobs::{JobError, SyncJob};

pub use locks::{DeviceLockGuard, DeviceLocks};

/// Pause after a queue failure before polling again
const QUEUE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Cooperative stop signal shared between the worker and whoever stops it.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn request(&self) {
        info!("Shutdown requested");
        self.requested.store(true, Ordering::Relaxed);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }
}

/// Result of one worker iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// Nothing arrived within the block interval
    Idle,
    Completed { uid: String, outcome: JobOutcome },
    /// Executor construction or execution failed; the job is not retried
    Failed { uid: String, error: String },
    /// The payload could not be decoded and was dropped
    Discarded { reason: String },
    /// The queue itself could not be read
    QueueUnavailable { error: String },
}

pub struct Worker<Q, D, C> {
    queue: Q,
    directory: D,
    connector: C,
    config: WorkerConfig,
    block: Duration,
    locks: DeviceLocks,
    shutdown: ShutdownHandle,
}

impl<Q, D, C> Worker<Q, D, C>
where
    Q: JobQueue,
    D: Directory,
    C: DeviceConnector,
{
    /// `block` bounds each wait on an empty queue, and with it how long a
    /// shutdown request can go unnoticed. Zero waits for the next job.
    pub fn new(queue: Q, directory: D, connector: C, config: WorkerConfig, block: Duration) -> Self {
        Self {
            queue,
            directory,
            connector,
            config,
            block,
            locks: DeviceLocks::new(),
            shutdown: ShutdownHandle::default(),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub const fn locks(&self) -> &DeviceLocks {
        &self.locks
    }

    /// Run `concurrency` loops until shutdown is requested.
    pub async fn run(&self) {
        let concurrency = self.config.concurrency.max(1);
        info!(
            concurrency,
            block_secs = self.block.as_secs(),
            push_failure_policy = ?self.config.push_failure_policy,
            "Starting sync worker"
        );

        join_all((0..concurrency).map(|slot| self.run_loop(slot))).await;

        info!("Sync worker stopped");
    }

    async fn run_loop(&self, slot: usize) {
        while !self.shutdown.is_requested() {
            if let Iteration::QueueUnavailable { .. } = self.run_once().await {
                tokio::time::sleep(QUEUE_RETRY_DELAY).await;
            }
        }
        debug!(slot, "Worker loop stopped");
    }

    /// Fetch and execute at most one job. Never fails: every error is
    /// logged and reported in the returned [`Iteration`].
    pub async fn run_once(&self) -> Iteration {
        let job = match SyncJob::fetch_next(&self.queue, self.block).await {
            Ok(Some(job)) => job,
            Ok(None) => return Iteration::Idle,
            Err(Error::Job(JobError::InvalidPayload(reason))) => {
                warn!(%reason, "Discarding undecodable sync job payload");
                return Iteration::Discarded { reason };
            }
            Err(e) => {
                error!(error = %e, "Failed to read sync queue");
                return Iteration::QueueUnavailable {
                    error: e.to_string(),
                };
            }
        };

        let uid = job.uid().to_string();
        let device_id = job.device_id();
        let _guard = self.locks.acquire(device_id).await;

        match self.execute(job).await {
            Ok(outcome) => Iteration::Completed { uid, outcome },
            Err(e) => {
                error!(uid = %uid, device_id, error = %e, "Sync job failed");
                Iteration::Failed {
                    uid,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn execute(&self, job: SyncJob) -> Result<JobOutcome> {
        let mut executor =
            SyncExecutor::connect(job, &self.queue, &self.directory, &self.connector)
                .await?
                .with_push_failure_policy(self.config.push_failure_policy);
        executor.execute().await
    }
}
