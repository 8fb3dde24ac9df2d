use mnoc_core::config::QueueConfig;
use mnoc_core::{SyncJob, SyncTarget};

use crate::commands::common::open_queue;
use crate::error::CliError;

/// Queue one job per device. Targets are validated before anything is
/// enqueued. Returns the submitted uids in device order.
pub async fn run_submit(
    device_ids: &[i64],
    sync_from: SyncTarget,
    sync_to: SyncTarget,
    queue_config: &QueueConfig,
) -> Result<Vec<String>, CliError> {
    let mut jobs = device_ids
        .iter()
        .map(|&device_id| SyncJob::from_targets(device_id, sync_from, sync_to))
        .collect::<Result<Vec<_>, _>>()?;

    let queue = open_queue(queue_config).await?;
    let mut uids = Vec::with_capacity(jobs.len());
    for job in &mut jobs {
        job.submit(&queue).await?;
        println!(
            "Submitted {} for device {} ({})",
            job.uid(),
            job.device_id(),
            job.direction()
        );
        uids.push(job.uid().to_string());
    }

    Ok(uids)
}
