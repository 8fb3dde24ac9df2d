//! Error types for mnoc-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::device::DeviceError;
use crate::directory::DirectoryError;
use crate::jobs::JobError;

/// Result type alias using mnoc-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in mnoc-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sync job construction or decoding error
    #[error("Sync job error: {0}")]
    Job(#[from] JobError),

    /// Directory service error
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// Network device error
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
