//! Sync targets and directions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::JobError;

/// One side of a synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTarget {
    /// Running configuration of the network device
    Device,
    /// Records held by the service directory
    Db,
}

impl SyncTarget {
    /// Every accepted target
    pub const ALL: [Self; 2] = [Self::Device, Self::Db];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Db => "db",
        }
    }
}

impl fmt::Display for SyncTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTarget {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|target| target.as_str() == s)
            .ok_or_else(|| JobError::UnknownTarget(s.to_string()))
    }
}

/// Direction of a sync, fixed when the job is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncDirection {
    /// Push the directory's desired state onto the device
    DbToDevice,
    /// Record the device's running state in the directory
    DeviceToDb,
}

impl SyncDirection {
    /// Pick the direction for a `from -> to` pair; the two must differ.
    pub fn from_targets(sync_from: SyncTarget, sync_to: SyncTarget) -> Result<Self, JobError> {
        match (sync_from, sync_to) {
            (SyncTarget::Db, SyncTarget::Device) => Ok(Self::DbToDevice),
            (SyncTarget::Device, SyncTarget::Db) => Ok(Self::DeviceToDb),
            (same, _) => Err(JobError::SameTargets(same)),
        }
    }

    /// Where configuration is read from
    pub const fn source(self) -> SyncTarget {
        match self {
            Self::DbToDevice => SyncTarget::Db,
            Self::DeviceToDb => SyncTarget::Device,
        }
    }

    /// Where configuration is applied
    pub const fn destination(self) -> SyncTarget {
        match self {
            Self::DbToDevice => SyncTarget::Device,
            Self::DeviceToDb => SyncTarget::Db,
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source(), self.destination())
    }
}
