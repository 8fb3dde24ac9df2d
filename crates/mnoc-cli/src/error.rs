use std::io;

use mnoc_core::config::ConfigError;
use mnoc_core::device::DeviceError;
use mnoc_core::directory::DirectoryError;
use mnoc_core::jobs::JobError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] mnoc_core::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Job(#[from] JobError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Concurrency must be between 1 and 64, got {0}")]
    InvalidConcurrency(usize),
}
