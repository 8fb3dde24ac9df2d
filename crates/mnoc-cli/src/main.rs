//! MNOC CLI - run the VLAN sync worker and manage its job queue

mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::filter::Directive;

use crate::cli::{Cli, Commands, QueueCommands};
use crate::commands::common::resolve_queue_config;
use crate::commands::plan::run_plan;
use crate::commands::queue::run_queue_list;
use crate::commands::submit::run_submit;
use crate::commands::worker::run_worker;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let default_directive: Directive = "mnoc=info"
        .parse()
        .unwrap_or_else(|_| Directive::from(tracing::Level::INFO));
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_directive),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Worker { concurrency } => {
            run_worker(cli.queue_path.as_deref(), concurrency).await?;
        }
        Commands::Submit {
            device_ids,
            from,
            to,
        } => {
            let queue_config = resolve_queue_config(cli.queue_path.as_deref())?;
            run_submit(&device_ids, from.into(), to.into(), &queue_config).await?;
        }
        Commands::Queue {
            command: QueueCommands::List { start, end, json },
        } => {
            let queue_config = resolve_queue_config(cli.queue_path.as_deref())?;
            run_queue_list(start, end, json, &queue_config).await?;
        }
        Commands::Plan {
            device_id,
            from,
            to,
            json,
        } => {
            run_plan(
                device_id,
                from.into(),
                to.into(),
                json,
                cli.queue_path.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}
