use std::path::Path;

use mnoc_core::device::connector_for;
use mnoc_core::directory::DirectoryClient;
use mnoc_core::worker::Worker;
use tracing::{info, warn};

use crate::commands::common::{open_queue, resolve_config};
use crate::error::CliError;

const MAX_CONCURRENCY: usize = 64;

/// Run the worker until Ctrl-C.
pub async fn run_worker(queue_path: Option<&Path>, concurrency: Option<usize>) -> Result<(), CliError> {
    let mut config = resolve_config(queue_path)?;
    if let Some(concurrency) = concurrency {
        config.worker.concurrency = validate_concurrency(concurrency)?;
    }

    let queue = open_queue(&config.queue).await?;
    let directory = DirectoryClient::from_config(&config.directory)?;
    let connector = connector_for(&config.device)?;
    info!(
        queue = %config.queue.path.display(),
        directory = directory.base_url(),
        "Worker configured"
    );

    let worker = Worker::new(queue, directory, connector, config.worker, config.queue.block);
    let shutdown = worker.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown.request(),
            Err(error) => warn!(%error, "Failed to listen for Ctrl-C"),
        }
    });

    worker.run().await;
    Ok(())
}

pub fn validate_concurrency(concurrency: usize) -> Result<usize, CliError> {
    if (1..=MAX_CONCURRENCY).contains(&concurrency) {
        Ok(concurrency)
    } else {
        Err(CliError::InvalidConcurrency(concurrency))
    }
}
