//! Device model

use serde::{Deserialize, Serialize};

/// Network device as recorded in the service directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Directory identifier
    pub id: i64,
    /// Unique device name
    #[serde(default)]
    pub name: String,
    /// Management IPv4 address used to reach the device
    pub management_ip: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_ignores_extra_fields() {
        let device: Device = serde_json::from_str(
            r#"{"id": 1, "name": "vsrx-1", "management_ip": "10.0.0.1", "site": "lab"}"#,
        )
        .unwrap();
        assert_eq!(device.management_ip, "10.0.0.1");
        assert_eq!(device.name, "vsrx-1");
    }
}
