//! mnoc-core - Core library for MNOC VLAN sync
//!
//! This crate contains the VLAN models, the durable job queue, the sync job
//! lifecycle, the reconciliation engine, and the executor and worker used by
//! the `mnoc` CLI and the `mnoc-api` server.

pub mod config;
pub mod db;
pub mod device;
pub mod directory;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod models;
pub mod reconcile;
pub mod util;
pub mod worker;

pub use error::{Error, Result};
pub use jobs::{JobStatus, SyncDirection, SyncJob, SyncTarget};
