//! Runtime configuration from environment variables.
//!
//! Every section parses through a `from_lookup` function so tests can feed a
//! plain map instead of touching the process environment. Binaries load a
//! `.env` file first (see `mnoc-cli`).

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// What the executor does when pushing configuration to a device fails
/// with a transient error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PushFailurePolicy {
    /// Log the failure; the job still counts as handled
    #[default]
    LogOnly,
    /// Treat it like a failed device read and reschedule the job
    Reschedule,
}

impl FromStr for PushFailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(Self::LogOnly),
            "reschedule" => Ok(Self::Reschedule),
            other => Err(ConfigError::Invalid(format!(
                "MNOC_PUSH_FAILURE_POLICY must be 'log' or 'reschedule', got '{other}'"
            ))),
        }
    }
}

/// Location and polling behaviour of the durable queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    pub path: PathBuf,
    pub poll_interval: Duration,
    /// Longest a worker blocks on an empty queue before re-checking shutdown
    pub block: Duration,
}

impl QueueConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let path = PathBuf::from(value_or_default(&lookup, "MNOC_QUEUE_PATH", "mnoc-queue.db"));
        let poll_interval_ms =
            parse_in_range(&lookup, "MNOC_QUEUE_POLL_INTERVAL_MS", "500", 10..=60_000)?;
        let block_secs = parse_in_range(&lookup, "MNOC_QUEUE_BLOCK_SECS", "5", 0..=3_600)?;

        Ok(Self {
            path,
            poll_interval: Duration::from_millis(poll_interval_ms),
            block: Duration::from_secs(block_secs),
        })
    }
}

/// Service directory REST API endpoint and credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct DirectoryConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DirectoryConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DirectoryConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = value_or_default(&lookup, "MNOC_API_HOST", "localhost");
        let port = optional_trimmed(&lookup, "MNOC_API_PORT")
            .map(|value| {
                value.parse::<u16>().map_err(|_| {
                    ConfigError::Invalid("MNOC_API_PORT must be a port number".to_string())
                })
            })
            .transpose()?;
        let user = required_trimmed(&lookup, "MNOC_API_USER")?;
        let password = required_trimmed(&lookup, "MNOC_API_PASSWORD")?;
        let timeout_secs = parse_in_range(&lookup, "MNOC_API_TIMEOUT_SECS", "10", 1..=300)?;

        Ok(Self {
            host,
            port,
            user,
            password,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// `http://{host}[:{port}]/service_directory/api`
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        match self.port {
            Some(port) => format!("http://{host}:{port}/service_directory/api"),
            None => format!("http://{host}/service_directory/api"),
        }
    }
}

/// How the worker reaches network devices.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    pub scheme: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vendor: String,
    pub timeout: Duration,
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DeviceConfig")
            .field("scheme", &self.scheme)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("vendor", &self.vendor)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DeviceConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let scheme = value_or_default(&lookup, "MNOC_DEVICE_SCHEME", "http").to_ascii_lowercase();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::Invalid(
                "MNOC_DEVICE_SCHEME must be http or https".to_string(),
            ));
        }

        let port = parse_in_range(&lookup, "MNOC_DEVICE_PORT", "3000", 1..=u16::MAX)?;
        let user = required_trimmed(&lookup, "MNOC_DEVICE_USER")?;
        let password = required_trimmed(&lookup, "MNOC_DEVICE_PASSWORD")?;
        let vendor = value_or_default(&lookup, "MNOC_DEVICE_VENDOR", "juniper").to_ascii_lowercase();
        let timeout_secs = parse_in_range(&lookup, "MNOC_DEVICE_TIMEOUT_SECS", "30", 1..=600)?;

        Ok(Self {
            scheme,
            port,
            user,
            password,
            vendor,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    pub concurrency: usize,
    pub push_failure_policy: PushFailurePolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            push_failure_policy: PushFailurePolicy::default(),
        }
    }
}

impl WorkerConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let concurrency = parse_in_range(&lookup, "MNOC_WORKER_CONCURRENCY", "1", 1..=64)?;
        let push_failure_policy =
            value_or_default(&lookup, "MNOC_PUSH_FAILURE_POLICY", "log").parse()?;

        Ok(Self {
            concurrency,
            push_failure_policy,
        })
    }
}

/// Everything the sync worker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MnocConfig {
    pub queue: QueueConfig,
    pub directory: DirectoryConfig,
    pub device: DeviceConfig,
    pub worker: WorkerConfig,
}

impl MnocConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            queue: QueueConfig::from_lookup(&lookup)?,
            directory: DirectoryConfig::from_lookup(&lookup)?,
            device: DeviceConfig::from_lookup(&lookup)?,
            worker: WorkerConfig::from_lookup(&lookup)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Private
// ---------------------------------------------------------------------------

fn parse_in_range<T>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: &str,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + fmt::Display,
{
    let invalid = || {
        ConfigError::Invalid(format!(
            "{name} must be an integer in [{}, {}]",
            range.start(),
            range.end()
        ))
    };

    let value = value_or_default(lookup, name, default)
        .parse::<T>()
        .map_err(|_| invalid())?;
    if !range.contains(&value) {
        return Err(invalid());
    }
    Ok(value)
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    crate::util::normalize_text_option(lookup(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("MNOC_API_USER", "netops"),
            ("MNOC_API_PASSWORD", "directory-secret"),
            ("MNOC_DEVICE_USER", "automation"),
            ("MNOC_DEVICE_PASSWORD", "device-secret"),
        ])
    }

    fn load(map: &HashMap<&'static str, &'static str>) -> Result<MnocConfig, ConfigError> {
        MnocConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_applies_defaults() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.queue.path, PathBuf::from("mnoc-queue.db"));
        assert_eq!(config.queue.poll_interval, Duration::from_millis(500));
        assert_eq!(config.queue.block, Duration::from_secs(5));
        assert_eq!(config.directory.host, "localhost");
        assert_eq!(config.directory.port, None);
        assert_eq!(config.directory.timeout, Duration::from_secs(10));
        assert_eq!(config.device.scheme, "http");
        assert_eq!(config.device.port, 3000);
        assert_eq!(config.device.vendor, "juniper");
        assert_eq!(config.device.timeout, Duration::from_secs(30));
        assert_eq!(config.worker, WorkerConfig::default());
    }

    #[test]
    fn config_requires_credentials() {
        let mut map = base_env();
        map.remove("MNOC_API_PASSWORD");
        assert_eq!(
            load(&map).unwrap_err(),
            ConfigError::MissingVar("MNOC_API_PASSWORD")
        );

        let mut map = base_env();
        map.insert("MNOC_DEVICE_USER", "   ");
        assert_eq!(
            load(&map).unwrap_err(),
            ConfigError::MissingVar("MNOC_DEVICE_USER")
        );
    }

    #[test]
    fn queue_config_needs_no_credentials() {
        let config = QueueConfig::from_lookup(|key| {
            (key == "MNOC_QUEUE_PATH").then(|| "/var/lib/mnoc/queue.db".to_string())
        })
        .unwrap();
        assert_eq!(config.path, PathBuf::from("/var/lib/mnoc/queue.db"));
    }

    #[test]
    fn config_rejects_out_of_range_values() {
        for (key, value) in [
            ("MNOC_QUEUE_POLL_INTERVAL_MS", "5"),
            ("MNOC_QUEUE_BLOCK_SECS", "abc"),
            ("MNOC_API_TIMEOUT_SECS", "0"),
            ("MNOC_API_PORT", "70000"),
            ("MNOC_DEVICE_TIMEOUT_SECS", "601"),
            ("MNOC_WORKER_CONCURRENCY", "0"),
            ("MNOC_WORKER_CONCURRENCY", "65"),
            ("MNOC_DEVICE_SCHEME", "ftp"),
            ("MNOC_PUSH_FAILURE_POLICY", "ignore"),
        ] {
            let mut map = base_env();
            map.insert(key, value);
            assert!(
                matches!(load(&map), Err(ConfigError::Invalid(_))),
                "{key}={value} was accepted"
            );
        }
    }

    #[test]
    fn config_reads_overrides() {
        let mut map = base_env();
        map.insert("MNOC_API_HOST", "directory.internal");
        map.insert("MNOC_API_PORT", "8000");
        map.insert("MNOC_WORKER_CONCURRENCY", "4");
        map.insert("MNOC_PUSH_FAILURE_POLICY", "Reschedule");
        map.insert("MNOC_DEVICE_SCHEME", "HTTPS");

        let config = load(&map).unwrap();
        assert_eq!(config.worker.concurrency, 4);
        assert_eq!(config.worker.push_failure_policy, PushFailurePolicy::Reschedule);
        assert_eq!(config.device.scheme, "https");
        assert_eq!(
            config.directory.base_url(),
            "http://directory.internal:8000/service_directory/api"
        );
    }

    #[test]
    fn base_url_without_port() {
        let config = load(&base_env()).unwrap();
        assert_eq!(
            config.directory.base_url(),
            "http://localhost/service_directory/api"
        );
    }

    #[test]
    fn config_redacts_sensitive_debug_fields() {
        let config = load(&base_env()).unwrap();
        let debug = format!("{config:?}");

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("directory-secret"));
        assert!(!debug.contains("device-secret"));
    }
}
