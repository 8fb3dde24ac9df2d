use std::path::Path;

use chrono::{DateTime, Utc};
use mnoc_core::config::{MnocConfig, QueueConfig};
use mnoc_core::db::LibSqlJobQueue;
use mnoc_core::SyncJob;

use crate::error::CliError;

/// Queue settings from the environment, with `--queue-path` taking precedence.
pub fn resolve_queue_config(queue_path: Option<&Path>) -> Result<QueueConfig, CliError> {
    let mut config = QueueConfig::from_env()?;
    if let Some(path) = queue_path {
        config.path = path.to_path_buf();
    }
    Ok(config)
}

/// Full worker configuration, with `--queue-path` taking precedence.
pub fn resolve_config(queue_path: Option<&Path>) -> Result<MnocConfig, CliError> {
    let mut config = MnocConfig::from_env()?;
    if let Some(path) = queue_path {
        config.queue.path = path.to_path_buf();
    }
    Ok(config)
}

pub async fn open_queue(config: &QueueConfig) -> Result<LibSqlJobQueue, CliError> {
    Ok(LibSqlJobQueue::open(&config.path)
        .await?
        .with_poll_interval(config.poll_interval))
}

pub fn format_job_line(job: &SyncJob, now: DateTime<Utc>) -> String {
    let queued = job.timestamp().map_or_else(
        || "-".to_string(),
        |timestamp| format_relative_time(timestamp.timestamp_millis(), now.timestamp_millis()),
    );
    let direction = job.direction().to_string();
    let attempts = format!("{}/{}", job.attempts_done(), job.attempts_target());

    format!(
        "{:<13}  device={:<6}  {direction:<10}  {:<7}  attempts={attempts:<5}  {queued}",
        job.uid(),
        job.device_id(),
        job.status().as_str(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}
