//! Database layer for MNOC

mod connection;
mod job_queue;
mod migrations;

pub use connection::Database;
pub use job_queue::{JobQueue, LibSqlJobQueue, DEFAULT_POLL_INTERVAL};
