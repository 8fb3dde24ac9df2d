//! The `SyncJob` unit of work and its queue lifecycle

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{JobError, SyncDirection, SyncTarget};
use crate::db::JobQueue;
use crate::error::Result;

/// Reschedules allowed before a job is marked failed
pub const DEFAULT_ATTEMPTS_TARGET: u32 = 2;

const UID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const UID_SUFFIX_LEN: usize = 8;

/// Lifecycle state, persisted by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    #[default]
    Todo,
    Redo,
    Success,
    Failure,
}

impl JobStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::Redo => "REDO",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What `SyncJob::reschedule` did with the job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescheduleOutcome {
    /// Pushed back onto the queue with `REDO`
    Requeued,
    /// Attempts exhausted; marked `FAILURE` and not requeued
    Dropped,
}

/// Wire representation of a job, as stored in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJobPayload {
    pub device_id: i64,
    pub sync_from: String,
    pub sync_to: String,
    pub timestamp: String,
    pub uid: String,
    pub status: JobStatus,
    pub attempts_target: u32,
    pub attempts_done: u32,
}

/// One directional VLAN synchronization for a device.
///
/// Fields only change through the lifecycle methods: `submit` stamps the
/// first enqueue time, `reschedule` moves the attempt counter and status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    device_id: i64,
    direction: SyncDirection,
    uid: String,
    timestamp: Option<DateTime<Utc>>,
    status: JobStatus,
    attempts_target: u32,
    attempts_done: u32,
}

impl SyncJob {
    /// Job type, also the uid prefix
    pub const JOB_TYPE: &'static str = "sync";

    /// `queue:` plus the job type
    pub const QUEUE_NAME: &'static str = "queue:sync";

    /// Build a job from textual targets (`"device"` or `"db"`).
    pub fn new(device_id: i64, sync_from: &str, sync_to: &str) -> std::result::Result<Self, JobError> {
        Self::from_targets(device_id, sync_from.parse()?, sync_to.parse()?)
    }

    /// Build a job from parsed targets; they must differ.
    pub fn from_targets(
        device_id: i64,
        sync_from: SyncTarget,
        sync_to: SyncTarget,
    ) -> std::result::Result<Self, JobError> {
        let direction = SyncDirection::from_targets(sync_from, sync_to)?;
        Ok(Self::with_direction(device_id, direction))
    }

    pub fn with_direction(device_id: i64, direction: SyncDirection) -> Self {
        Self {
            device_id,
            direction,
            uid: generate_uid(),
            timestamp: None,
            status: JobStatus::Todo,
            attempts_target: DEFAULT_ATTEMPTS_TARGET,
            attempts_done: 0,
        }
    }

    #[must_use]
    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    #[must_use]
    pub const fn with_attempts_target(mut self, attempts_target: u32) -> Self {
        self.attempts_target = attempts_target;
        self
    }

    pub const fn device_id(&self) -> i64 {
        self.device_id
    }

    pub const fn direction(&self) -> SyncDirection {
        self.direction
    }

    pub const fn sync_from(&self) -> SyncTarget {
        self.direction.source()
    }

    pub const fn sync_to(&self) -> SyncTarget {
        self.direction.destination()
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub const fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub const fn status(&self) -> JobStatus {
        self.status
    }

    pub const fn attempts_target(&self) -> u32 {
        self.attempts_target
    }

    pub const fn attempts_done(&self) -> u32 {
        self.attempts_done
    }

    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record that the job ran to completion. Not persisted.
    pub fn mark_succeeded(&mut self) {
        self.status = JobStatus::Success;
    }

    /// Wire form of the job; requires a timestamp.
    pub fn to_payload(&self) -> std::result::Result<SyncJobPayload, JobError> {
        let timestamp = self
            .timestamp
            .ok_or_else(|| JobError::MissingTimestamp(self.uid.clone()))?;

        Ok(SyncJobPayload {
            device_id: self.device_id,
            sync_from: self.sync_from().to_string(),
            sync_to: self.sync_to().to_string(),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            uid: self.uid.clone(),
            status: self.status,
            attempts_target: self.attempts_target,
            attempts_done: self.attempts_done,
        })
    }

    /// Serialize to the canonical JSON object stored in the queue.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_payload()?)?)
    }

    /// Inverse of [`SyncJob::encode`]. Any decode or validation failure is
    /// reported as `InvalidPayload`.
    pub fn decode(payload: &str) -> std::result::Result<Self, JobError> {
        let payload: SyncJobPayload =
            serde_json::from_str(payload).map_err(|e| JobError::InvalidPayload(e.to_string()))?;
        Self::try_from(payload)
    }

    /// Stamp the job (first time only) and push it onto the sync queue.
    pub async fn submit<Q: JobQueue>(&mut self, queue: &Q) -> Result<()> {
        if self.timestamp.is_none() {
            self.timestamp = Some(Utc::now());
        }

        let payload = self.encode()?;
        queue.put(Self::QUEUE_NAME, &payload).await?;

        info!(
            uid = %self.uid,
            device_id = self.device_id,
            direction = %self.direction,
            status = %self.status,
            "Submitted sync job"
        );
        Ok(())
    }

    /// Block up to `block` (zero waits forever) for the next queued job.
    pub async fn fetch_next<Q: JobQueue>(queue: &Q, block: Duration) -> Result<Option<Self>> {
        let Some(payload) = queue.get(Self::QUEUE_NAME, block).await? else {
            return Ok(None);
        };

        let job = Self::decode(&payload)?;
        debug!(uid = %job.uid, device_id = job.device_id, "Fetched sync job");
        Ok(Some(job))
    }

    /// Requeue after a recoverable failure, or mark the job failed once its
    /// attempts are used up. `force` requeues regardless of attempts.
    pub async fn reschedule<Q: JobQueue>(&mut self, queue: &Q, force: bool) -> Result<RescheduleOutcome> {
        if self.attempts_done < self.attempts_target || force {
            self.attempts_done = self.attempts_done.saturating_add(1);
            self.status = JobStatus::Redo;
            self.submit(queue).await?;

            info!(
                uid = %self.uid,
                attempts_done = self.attempts_done,
                attempts_target = self.attempts_target,
                "Rescheduled sync job"
            );
            return Ok(RescheduleOutcome::Requeued);
        }

        self.status = JobStatus::Failure;
        warn!(
            uid = %self.uid,
            device_id = self.device_id,
            attempts_done = self.attempts_done,
            "Sync job failed after exhausting attempts"
        );
        Ok(RescheduleOutcome::Dropped)
    }
}

impl TryFrom<SyncJobPayload> for SyncJob {
    type Error = JobError;

    fn try_from(payload: SyncJobPayload) -> std::result::Result<Self, Self::Error> {
        let invalid = |e: JobError| JobError::InvalidPayload(e.to_string());

        let sync_from: SyncTarget = payload.sync_from.parse().map_err(invalid)?;
        let sync_to: SyncTarget = payload.sync_to.parse().map_err(invalid)?;
        let direction = SyncDirection::from_targets(sync_from, sync_to).map_err(invalid)?;

        Ok(Self {
            device_id: payload.device_id,
            direction,
            uid: payload.uid,
            timestamp: Some(parse_timestamp(&payload.timestamp)?),
            status: payload.status,
            attempts_target: payload.attempts_target,
            attempts_done: payload.attempts_done,
        })
    }
}

impl fmt::Display for SyncJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} device={} {} status={} attempts={}/{}",
            self.uid,
            self.device_id,
            self.direction,
            self.status,
            self.attempts_done,
            self.attempts_target
        )
    }
}

fn generate_uid() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..UID_SUFFIX_LEN)
        .map(|_| char::from(UID_CHARSET[rng.gen_range(0..UID_CHARSET.len())]))
        .collect();
    format!("{}-{suffix}", SyncJob::JOB_TYPE)
}

/// RFC 3339, or a naive ISO-8601 datetime taken as UTC.
fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, JobError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| JobError::InvalidPayload(format!("invalid timestamp '{value}': {e}")))
}
