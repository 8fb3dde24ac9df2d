//! Data models for MNOC

mod device;
mod vlan;

pub use device::Device;
pub use vlan::{
    without_default, DbVlan, DeviceVlan, NewVlan, VlanRecord, VlanRole, DEFAULT_VLAN_NAME,
    DEFAULT_VLAN_TAG,
};
