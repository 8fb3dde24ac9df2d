//! VLAN models
//!
//! The same VLAN looks different depending on where it was read from. The
//! device reports `vlan-id`, the directory stores `tag` plus its own row
//! identity. Both representations implement [`VlanRecord`] so the
//! reconciliation engine can compare them field by field.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::util::non_blank_str;

/// Tag of the reserved default VLAN.
pub const DEFAULT_VLAN_TAG: u16 = 1;

/// Name of the reserved default VLAN.
pub const DEFAULT_VLAN_NAME: &str = "default";

/// Which system a VLAN representation originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VlanRole {
    /// Read from the network device configuration
    Device,
    /// Read from the service directory
    Db,
}

impl fmt::Display for VlanRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Device => write!(f, "device"),
            Self::Db => write!(f, "db"),
        }
    }
}

/// Significant attributes shared by every VLAN representation.
pub trait VlanRecord {
    /// Origin of this representation
    const ROLE: VlanRole;

    /// 802.1Q tag
    fn tag(&self) -> u16;

    /// VLAN name
    fn name(&self) -> &str;

    /// Free-form description
    fn description(&self) -> Option<&str>;

    /// Whether this is the reserved default VLAN, which is never synced.
    fn is_default(&self) -> bool {
        self.tag() == DEFAULT_VLAN_TAG && self.name() == DEFAULT_VLAN_NAME
    }

    /// Tag, name and description all equal. Blank descriptions compare
    /// equal to missing ones; any other description must match exactly.
    fn matches<O: VlanRecord>(&self, other: &O) -> bool {
        self.matches_tag(other)
            && self.name() == other.name()
            && non_blank_str(self.description()) == non_blank_str(other.description())
    }

    /// Same tag, regardless of the other fields.
    fn matches_tag<O: VlanRecord>(&self, other: &O) -> bool {
        self.tag() == other.tag()
    }
}

/// VLAN as configured on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceVlan {
    pub name: String,
    #[serde(rename = "vlan-id", deserialize_with = "deserialize_vlan_id")]
    pub vlan_id: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DeviceVlan {
    pub fn new(name: impl Into<String>, vlan_id: u16, description: Option<&str>) -> Self {
        Self {
            name: name.into(),
            vlan_id,
            description: description.map(ToOwned::to_owned),
        }
    }

    /// Build the device form of a VLAN from any other representation.
    pub fn from_record<R: VlanRecord>(record: &R) -> Self {
        Self {
            name: record.name().to_string(),
            vlan_id: record.tag(),
            description: record.description().map(ToOwned::to_owned),
        }
    }
}

impl VlanRecord for DeviceVlan {
    const ROLE: VlanRole = VlanRole::Device;

    fn tag(&self) -> u16 {
        self.vlan_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// VLAN row stored in the service directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbVlan {
    pub id: i64,
    pub tag: u16,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub device: i64,
}

impl DbVlan {
    /// Copy of this row carrying another record's tag, name and description.
    #[must_use]
    pub fn with_values_of<R: VlanRecord>(&self, desired: &R) -> Self {
        Self {
            id: self.id,
            tag: desired.tag(),
            name: desired.name().to_string(),
            description: desired.description().map(ToOwned::to_owned),
            device: self.device,
        }
    }
}

impl VlanRecord for DbVlan {
    const ROLE: VlanRole = VlanRole::Db;

    fn tag(&self) -> u16 {
        self.tag
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Create request for a directory VLAN row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVlan {
    pub tag: u16,
    pub name: String,
    pub description: Option<String>,
    pub device: i64,
}

impl NewVlan {
    pub fn for_device<R: VlanRecord>(record: &R, device_id: i64) -> Self {
        Self {
            tag: record.tag(),
            name: record.name().to_string(),
            description: record.description().map(ToOwned::to_owned),
            device: device_id,
        }
    }
}

/// Drop the reserved default VLAN from a device read.
pub fn without_default<R: VlanRecord>(vlans: Vec<R>) -> Vec<R> {
    vlans.into_iter().filter(|vlan| !vlan.is_default()).collect()
}

/// Junos renders `vlan-id` as a number in some releases and as a string in others.
fn deserialize_vlan_id<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawVlanId {
        Number(u16),
        Text(String),
    }

    match RawVlanId::deserialize(deserializer)? {
        RawVlanId::Number(value) => Ok(value),
        RawVlanId::Text(value) => value
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid vlan-id: {value}"))),
    }
}
