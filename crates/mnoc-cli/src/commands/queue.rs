use chrono::Utc;
use mnoc_core::config::QueueConfig;
use mnoc_core::db::JobQueue;
use mnoc_core::SyncJob;

use crate::commands::common::{format_job_line, open_queue};
use crate::error::CliError;

pub async fn run_queue_list(
    start: i64,
    end: i64,
    as_json: bool,
    queue_config: &QueueConfig,
) -> Result<(), CliError> {
    let queue = open_queue(queue_config).await?;
    let payloads = queue.list(SyncJob::QUEUE_NAME, start, end).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&payloads_to_json(&payloads))?);
        return Ok(());
    }

    if payloads.is_empty() {
        println!("No queued sync jobs.");
        return Ok(());
    }

    for line in format_queue_lines(&payloads) {
        println!("{line}");
    }
    Ok(())
}

/// Queued payloads as JSON values; anything that isn't JSON is kept as a string.
pub fn payloads_to_json(payloads: &[String]) -> Vec<serde_json::Value> {
    payloads
        .iter()
        .map(|payload| {
            serde_json::from_str(payload)
                .unwrap_or_else(|_| serde_json::Value::String(payload.clone()))
        })
        .collect()
}

pub fn format_queue_lines(payloads: &[String]) -> Vec<String> {
    let now = Utc::now();
    payloads
        .iter()
        .map(|payload| match SyncJob::decode(payload) {
            Ok(job) => format_job_line(&job, now),
            Err(error) => format!("<undecodable>  {error}"),
        })
        .collect()
}
