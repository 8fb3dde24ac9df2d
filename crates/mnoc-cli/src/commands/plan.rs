use std::path::Path;

use mnoc_core::device::connector_for;
use mnoc_core::directory::DirectoryClient;
use mnoc_core::executor::SyncExecutor;
use mnoc_core::models::Device;
use mnoc_core::reconcile::DiffSummary;
use mnoc_core::{SyncJob, SyncTarget};
use serde::Serialize;

use crate::commands::common::{open_queue, resolve_config};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct PlanReport {
    pub device_id: i64,
    pub device_name: String,
    pub management_ip: String,
    pub direction: String,
    #[serde(flatten)]
    pub summary: DiffSummary,
    pub in_sync: bool,
}

impl PlanReport {
    pub fn new(job: &SyncJob, device: &Device, summary: DiffSummary) -> Self {
        Self {
            device_id: job.device_id(),
            device_name: device.name.clone(),
            management_ip: device.management_ip.clone(),
            direction: job.direction().to_string(),
            summary,
            in_sync: summary.pending_changes() == 0,
        }
    }
}

/// Dry run: reconcile one device and print the difference.
pub async fn run_plan(
    device_id: i64,
    sync_from: SyncTarget,
    sync_to: SyncTarget,
    as_json: bool,
    queue_path: Option<&Path>,
) -> Result<(), CliError> {
    let job = SyncJob::from_targets(device_id, sync_from, sync_to)?;
    let config = resolve_config(queue_path)?;
    let queue = open_queue(&config.queue).await?;
    let directory = DirectoryClient::from_config(&config.directory)?;
    let connector = connector_for(&config.device)?;

    let executor = SyncExecutor::connect(job, &queue, &directory, &connector).await?;
    let summary = executor.plan().await?;
    let report = PlanReport::new(executor.job(), executor.device(), summary);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_plan_lines(&report) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_plan_lines(report: &PlanReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Device {} ({}, {}) {}",
        report.device_id, report.device_name, report.management_ip, report.direction
    )];

    if report.in_sync {
        lines.push(format!("  in sync ({} VLANs)", report.summary.synced));
        return lines;
    }

    let summary = &report.summary;
    lines.extend([
        format!("  synced:      {}", summary.synced),
        format!("  altered:     {}", summary.altered),
        format!("  non-present: {}", summary.non_present),
        format!("  removed:     {}", summary.removed),
    ]);
    lines
}
