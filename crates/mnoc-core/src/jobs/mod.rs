//! Sync jobs: construction, queue lifecycle and wire format

mod sync_job;
mod target;

use thiserror::Error;

pub use sync_job::{JobStatus, RescheduleOutcome, SyncJob, SyncJobPayload, DEFAULT_ATTEMPTS_TARGET};
pub use target::{SyncDirection, SyncTarget};

/// Errors raised while building or decoding a sync job
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("unknown sync target '{0}' (expected 'device' or 'db')")]
    UnknownTarget(String),

    #[error("sync_from and sync_to must differ (both are '{0}')")]
    SameTargets(SyncTarget),

    #[error("invalid job payload: {0}")]
    InvalidPayload(String),

    #[error("job {0} has no timestamp; submit it before encoding")]
    MissingTimestamp(String),
}
