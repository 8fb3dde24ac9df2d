//! Network device access.
//!
//! A [`DeviceConnector`] binds a [`DeviceTransport`] to one management
//! address. Juniper devices are reached over the Junos REST API.

mod junos;
mod template;

use thiserror::Error;

use crate::config::DeviceConfig;
use crate::models::DeviceVlan;

pub use junos::{JunosRestConnector, JunosRestTransport};
pub use template::VlanConfigTemplate;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Unsupported device vendor '{0}' (supported: juniper)")]
    UnsupportedVendor(String),
    #[error("Device {host} unreachable: {message}")]
    Unreachable { host: String, message: String },
    #[error("Device RPC failed on {host}: {message}")]
    Rpc { host: String, message: String },
    #[error("Invalid device response: {0}")]
    InvalidResponse(String),
    #[error("Failed to render VLAN configuration: {0}")]
    Template(String),
}

impl DeviceError {
    /// Whether retrying later may succeed (network trouble, a held lock, a
    /// failed commit). Malformed data and bad configuration are permanent.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Rpc { .. })
    }
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Session with one device (async)
#[allow(async_fn_in_trait)]
pub trait DeviceTransport {
    /// Every VLAN in the device's committed configuration, default included
    async fn get_vlan_list(&self) -> DeviceResult<Vec<DeviceVlan>>;

    /// Replace the device's VLAN configuration with `vlans` in one exclusive
    /// commit. The reserved default VLAN is always kept.
    async fn sync_config_to_vlans(&self, vlans: &[DeviceVlan]) -> DeviceResult<()>;
}

/// Opens transports by management address.
pub trait DeviceConnector {
    type Transport: DeviceTransport;

    fn connect(&self, host: &str) -> DeviceResult<Self::Transport>;
}

/// Build the connector matching the configured vendor.
pub fn connector_for(config: &DeviceConfig) -> DeviceResult<JunosRestConnector> {
    match config.vendor.as_str() {
        "juniper" => JunosRestConnector::from_config(config),
        other => Err(DeviceError::UnsupportedVendor(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn device_config(vendor: &str) -> DeviceConfig {
        DeviceConfig {
            scheme: "http".to_string(),
            port: 3000,
            user: "automation".to_string(),
            password: "secret".to_string(),
            vendor: vendor.to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn connector_for_rejects_other_vendors() {
        assert!(connector_for(&device_config("juniper")).is_ok());
        assert!(matches!(
            connector_for(&device_config("cisco")),
            Err(DeviceError::UnsupportedVendor(vendor)) if vendor == "cisco"
        ));
    }

    #[test]
    fn transient_classification() {
        let unreachable = DeviceError::Unreachable {
            host: "10.0.0.1".to_string(),
            message: "timed out".to_string(),
        };
        let rpc = DeviceError::Rpc {
            host: "10.0.0.1".to_string(),
            message: "configuration database locked".to_string(),
        };

        assert!(unreachable.is_transient());
        assert!(rpc.is_transient());
        assert!(!DeviceError::InvalidResponse("garbage".to_string()).is_transient());
        assert!(!DeviceError::Template("bad".to_string()).is_transient());
        assert!(!DeviceError::UnsupportedVendor("cisco".to_string()).is_transient());
    }
}
