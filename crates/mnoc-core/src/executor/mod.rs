//! Executes one sync job end to end.
//!
//! The executor resolves the device through the directory, reads both VLAN
//! sets, reconciles them and writes the difference to whichever side the
//! job's direction names as destination.

use std::fmt;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::PushFailurePolicy;
use crate::db::JobQueue;
use crate::device::{DeviceConnector, DeviceTransport};
use crate::directory::Directory;
use crate::error::Result;
use crate::jobs::{JobStatus, RescheduleOutcome, SyncDirection, SyncJob};
use crate::models::{without_default, DbVlan, Device, DeviceVlan, NewVlan};
use crate::reconcile::{reconcile, DiffSummary};

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Both sides already agree
    InSync,
    /// The full desired VLAN list was committed on the device
    PushedToDevice { vlans: usize },
    /// A transient push failure was logged and not retried
    PushFailed,
    AppliedToDirectory {
        updated: usize,
        created: usize,
        deleted: usize,
    },
    /// Requeued for another attempt
    Rescheduled,
    /// Attempts exhausted; the job was marked failed
    Dropped,
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InSync => f.write_str("in sync"),
            Self::PushedToDevice { vlans } => write!(f, "pushed {vlans} VLANs to device"),
            Self::PushFailed => f.write_str("push to device failed"),
            Self::AppliedToDirectory {
                updated,
                created,
                deleted,
            } => write!(
                f,
                "directory updated={updated} created={created} deleted={deleted}"
            ),
            Self::Rescheduled => f.write_str("rescheduled"),
            Self::Dropped => f.write_str("dropped after exhausting attempts"),
        }
    }
}

/// Runs a single [`SyncJob`] against one device.
pub struct SyncExecutor<'a, Q, D, T> {
    job: SyncJob,
    device: Device,
    queue: &'a Q,
    directory: &'a D,
    transport: T,
    push_failure_policy: PushFailurePolicy,
}

impl<'a, Q, D, T> SyncExecutor<'a, Q, D, T>
where
    Q: JobQueue,
    D: Directory,
    T: DeviceTransport,
{
    /// Resolve the job's device and open a transport to its management
    /// address.
    pub async fn connect<C>(
        job: SyncJob,
        queue: &'a Q,
        directory: &'a D,
        connector: &C,
    ) -> Result<Self>
    where
        C: DeviceConnector<Transport = T>,
    {
        let device = directory.get_device(job.device_id()).await?;
        let transport = connector.connect(&device.management_ip)?;

        Ok(Self {
            job,
            device,
            queue,
            directory,
            transport,
            push_failure_policy: PushFailurePolicy::default(),
        })
    }

    #[must_use]
    pub const fn with_push_failure_policy(mut self, policy: PushFailurePolicy) -> Self {
        self.push_failure_policy = policy;
        self
    }

    pub const fn job(&self) -> &SyncJob {
        &self.job
    }

    pub const fn device(&self) -> &Device {
        &self.device
    }

    pub fn into_job(self) -> SyncJob {
        self.job
    }

    /// Device VLANs minus the default VLAN.
    ///
    /// A transient transport failure reschedules the job and yields `None`;
    /// the caller should stop there.
    pub async fn fetch_from_device(&mut self) -> Result<Option<Vec<DeviceVlan>>> {
        match self.transport.get_vlan_list().await {
            Ok(vlans) => Ok(Some(without_default(vlans))),
            Err(e) if e.is_transient() => {
                warn!(
                    uid = %self.job.uid(),
                    device_id = self.job.device_id(),
                    error = %e,
                    "Device read failed; rescheduling"
                );
                self.job.reschedule(self.queue, false).await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn fetch_from_db(&self) -> Result<Vec<DbVlan>> {
        Ok(self.directory.list_vlans(self.job.device_id()).await?)
    }

    pub async fn execute(&mut self) -> Result<JobOutcome> {
        let Some(device_vlans) = self.fetch_from_device().await? else {
            return Ok(self.reschedule_outcome());
        };
        let db_vlans = self.fetch_from_db().await?;

        let outcome = match self.job.direction() {
            SyncDirection::DbToDevice => self.push_to_device(&device_vlans, &db_vlans).await?,
            SyncDirection::DeviceToDb => self.apply_to_directory(&db_vlans, &device_vlans).await?,
        };

        // A push failure that was only logged leaves the status untouched.
        if !matches!(
            outcome,
            JobOutcome::Rescheduled | JobOutcome::Dropped | JobOutcome::PushFailed
        ) {
            self.job.mark_succeeded();
        }
        info!(
            uid = %self.job.uid(),
            device_id = self.job.device_id(),
            device = %self.device.name,
            direction = %self.job.direction(),
            %outcome,
            "Sync job finished"
        );
        Ok(outcome)
    }

    /// Reconcile without writing anything. Unlike `execute`, device errors
    /// are returned rather than rescheduled.
    pub async fn plan(&self) -> Result<DiffSummary> {
        let device_vlans = without_default(self.transport.get_vlan_list().await?);
        let db_vlans = self.fetch_from_db().await?;

        Ok(match self.job.direction() {
            SyncDirection::DbToDevice => reconcile(&device_vlans, &db_vlans).summary(),
            SyncDirection::DeviceToDb => reconcile(&db_vlans, &device_vlans).summary(),
        })
    }

    async fn push_to_device(
        &mut self,
        device_vlans: &[DeviceVlan],
        db_vlans: &[DbVlan],
    ) -> Result<JobOutcome> {
        let diff = reconcile(device_vlans, db_vlans);
        if diff.is_in_sync() {
            return Ok(JobOutcome::InSync);
        }

        let desired: Vec<DeviceVlan> = db_vlans.iter().map(DeviceVlan::from_record).collect();
        match self.transport.sync_config_to_vlans(&desired).await {
            Ok(()) => Ok(JobOutcome::PushedToDevice {
                vlans: desired.len(),
            }),
            Err(e) if e.is_transient() => match self.push_failure_policy {
                PushFailurePolicy::LogOnly => {
                    error!(
                        uid = %self.job.uid(),
                        device_id = self.job.device_id(),
                        error = %e,
                        "Failed to push VLAN configuration to device"
                    );
                    Ok(JobOutcome::PushFailed)
                }
                PushFailurePolicy::Reschedule => {
                    warn!(
                        uid = %self.job.uid(),
                        device_id = self.job.device_id(),
                        error = %e,
                        "Device push failed; rescheduling"
                    );
                    Ok(self.job.reschedule(self.queue, false).await?.into())
                }
            },
            Err(e) => Err(e.into()),
        }
    }

    // Writes go out one by one; a failure part way leaves earlier writes applied.
    async fn apply_to_directory(
        &self,
        db_vlans: &[DbVlan],
        device_vlans: &[DeviceVlan],
    ) -> Result<JobOutcome> {
        let diff = reconcile(db_vlans, device_vlans);
        if diff.is_in_sync() {
            return Ok(JobOutcome::InSync);
        }

        for altered in &diff.altered {
            self.directory
                .update_vlan(&altered.current.with_values_of(&altered.desired))
                .await?;
        }
        for vlan in &diff.non_present {
            self.directory
                .create_vlan(&NewVlan::for_device(vlan, self.job.device_id()))
                .await?;
        }
        for vlan in &diff.removed {
            self.directory.delete_vlan(vlan.id).await?;
        }

        Ok(JobOutcome::AppliedToDirectory {
            updated: diff.altered.len(),
            created: diff.non_present.len(),
            deleted: diff.removed.len(),
        })
    }

    fn reschedule_outcome(&self) -> JobOutcome {
        if self.job.status() == JobStatus::Failure {
            JobOutcome::Dropped
        } else {
            JobOutcome::Rescheduled
        }
    }
}

impl From<RescheduleOutcome> for JobOutcome {
    fn from(outcome: RescheduleOutcome) -> Self {
        match outcome {
            RescheduleOutcome::Requeued => Self::Rescheduled,
            RescheduleOutcome::Dropped => Self::Dropped,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory collaborators shared by executor and worker tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::device::{DeviceConnector, DeviceError, DeviceResult, DeviceTransport};
    use crate::directory::{Directory, DirectoryError, DirectoryResult};
    use crate::models::{DbVlan, Device, DeviceVlan, NewVlan};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Failure {
        Transient,
        Permanent,
    }

    impl Failure {
        fn to_error(self) -> DeviceError {
            match self {
                Self::Transient => DeviceError::Unreachable {
                    host: "10.0.0.5".to_string(),
                    message: "connection refused".to_string(),
                },
                Self::Permanent => DeviceError::InvalidResponse("not json".to_string()),
            }
        }
    }

    #[derive(Clone, Default)]
    pub struct FakeDevice {
        pub vlans: Arc<Mutex<Vec<DeviceVlan>>>,
        pub pushes: Arc<Mutex<Vec<Vec<DeviceVlan>>>>,
        pub read_failure: Option<Failure>,
        pub push_failure: Option<Failure>,
        pub read_delay: Duration,
        pub in_flight: Arc<AtomicUsize>,
        pub max_in_flight: Arc<AtomicUsize>,
    }

    impl FakeDevice {
        pub fn with_vlans(vlans: Vec<DeviceVlan>) -> Self {
            Self {
                vlans: Arc::new(Mutex::new(vlans)),
                ..Self::default()
            }
        }

        pub fn push_count(&self) -> usize {
            self.pushes.lock().unwrap().len()
        }
    }

    impl DeviceTransport for FakeDevice {
        async fn get_vlan_list(&self) -> DeviceResult<Vec<DeviceVlan>> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            if !self.read_delay.is_zero() {
                tokio::time::sleep(self.read_delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some(failure) = self.read_failure {
                return Err(failure.to_error());
            }
            Ok(self.vlans.lock().unwrap().clone())
        }

        async fn sync_config_to_vlans(&self, vlans: &[DeviceVlan]) -> DeviceResult<()> {
            if let Some(failure) = self.push_failure {
                return Err(failure.to_error());
            }
            self.pushes.lock().unwrap().push(vlans.to_vec());
            *self.vlans.lock().unwrap() = vlans.to_vec();
            Ok(())
        }
    }

    impl DeviceConnector for FakeDevice {
        type Transport = Self;

        fn connect(&self, _host: &str) -> DeviceResult<Self> {
            Ok(self.clone())
        }
    }

    #[derive(Clone, Default)]
    pub struct FakeDirectory {
        pub vlans: Arc<Mutex<Vec<DbVlan>>>,
        pub calls: Arc<Mutex<Vec<String>>>,
        pub fail_list: bool,
        pub fail_create: bool,
        pub next_id: Arc<Mutex<i64>>,
    }

    impl FakeDirectory {
        pub fn with_vlans(vlans: Vec<DbVlan>) -> Self {
            let next_id = vlans.iter().map(|vlan| vlan.id).max().unwrap_or(0) + 1;
            Self {
                vlans: Arc::new(Mutex::new(vlans)),
                next_id: Arc::new(Mutex::new(next_id)),
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn unavailable() -> DirectoryError {
            DirectoryError::Api {
                status: 503,
                message: "Service unavailable".to_string(),
            }
        }
    }

    impl Directory for FakeDirectory {
        async fn get_device(&self, device_id: i64) -> DirectoryResult<Device> {
            if device_id <= 0 {
                return Err(DirectoryError::Api {
                    status: 404,
                    message: "Not found.".to_string(),
                });
            }
            Ok(Device {
                id: device_id,
                name: format!("vsrx-{device_id}"),
                management_ip: "10.0.0.5".to_string(),
            })
        }

        async fn list_vlans(&self, device_id: i64) -> DirectoryResult<Vec<DbVlan>> {
            if self.fail_list {
                return Err(Self::unavailable());
            }
            Ok(self
                .vlans
                .lock()
                .unwrap()
                .iter()
                .filter(|vlan| vlan.device == device_id)
                .cloned()
                .collect())
        }

        async fn create_vlan(&self, vlan: &NewVlan) -> DirectoryResult<()> {
            if self.fail_create {
                return Err(Self::unavailable());
            }
            self.record(format!("create {}", vlan.tag));
            let mut next_id = self.next_id.lock().unwrap();
            self.vlans.lock().unwrap().push(DbVlan {
                id: *next_id,
                tag: vlan.tag,
                name: vlan.name.clone(),
                description: vlan.description.clone(),
                device: vlan.device,
            });
            *next_id += 1;
            Ok(())
        }

        async fn update_vlan(&self, vlan: &DbVlan) -> DirectoryResult<()> {
            self.record(format!("update {} -> {}", vlan.id, vlan.name));
            let mut vlans = self.vlans.lock().unwrap();
            if let Some(existing) = vlans.iter_mut().find(|existing| existing.id == vlan.id) {
                *existing = vlan.clone();
            }
            Ok(())
        }

        async fn delete_vlan(&self, vlan_id: i64) -> DirectoryResult<()> {
            self.record(format!("delete {vlan_id}"));
            self.vlans.lock().unwrap().retain(|vlan| vlan.id != vlan_id);
            Ok(())
        }
    }

    pub fn db_vlan(id: i64, tag: u16, name: &str, description: Option<&str>) -> DbVlan {
        DbVlan {
            id,
            tag,
            name: name.to_string(),
            description: description.map(ToOwned::to_owned),
            device: 5,
        }
    }
}
