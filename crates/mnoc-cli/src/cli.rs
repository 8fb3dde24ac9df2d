use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mnoc_core::SyncTarget;

#[derive(Parser)]
#[command(name = "mnoc")]
#[command(about = "Keep network device VLANs in sync with the service directory")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the job queue database (overrides MNOC_QUEUE_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub queue_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the sync worker until interrupted
    Worker {
        /// Number of concurrent worker loops (overrides MNOC_WORKER_CONCURRENCY)
        #[arg(short, long)]
        concurrency: Option<usize>,
    },
    /// Queue sync jobs for one or more devices
    Submit {
        /// Directory IDs of the devices to sync
        #[arg(required = true)]
        device_ids: Vec<i64>,
        /// Side to read the desired state from
        #[arg(long, value_enum, default_value_t = Target::Db)]
        from: Target,
        /// Side to write to
        #[arg(long, value_enum, default_value_t = Target::Device)]
        to: Target,
    },
    /// Inspect the sync queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Show what a sync would change, without changing anything
    Plan {
        /// Directory ID of the device
        device_id: i64,
        /// Side to read the desired state from
        #[arg(long, value_enum, default_value_t = Target::Db)]
        from: Target,
        /// Side to write to
        #[arg(long, value_enum, default_value_t = Target::Device)]
        to: Target,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List queued sync jobs without removing them
    List {
        /// First index (negative counts from the tail)
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        start: i64,
        /// Last index, inclusive (negative counts from the tail)
        #[arg(long, default_value = "10", allow_hyphen_values = true)]
        end: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum Target {
    Device,
    Db,
}

impl From<Target> for SyncTarget {
    fn from(target: Target) -> Self {
        match target {
            Target::Device => Self::Device,
            Target::Db => Self::Db,
        }
    }
}
