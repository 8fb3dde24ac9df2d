//! Per-device single-flight locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<i64, Arc<AsyncMutex<()>>>;

/// At most one job per device runs at a time. Entries exist only while a
/// lock is held or awaited.
#[derive(Debug, Clone, Default)]
pub struct DeviceLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl DeviceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other job holds `device_id`, then hold it until the
    /// guard is dropped.
    pub async fn acquire(&self, device_id: i64) -> DeviceLockGuard {
        let lock = self.map().entry(device_id).or_default().clone();
        let guard = lock.lock_owned().await;

        DeviceLockGuard {
            device_id,
            locks: self.clone(),
            guard: Some(guard),
        }
    }

    /// Devices currently locked or awaited
    pub fn active_devices(&self) -> usize {
        self.map().len()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the device when dropped.
#[derive(Debug)]
pub struct DeviceLockGuard {
    device_id: i64,
    locks: DeviceLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl DeviceLockGuard {
    pub const fn device_id(&self) -> i64 {
        self.device_id
    }
}

impl Drop for DeviceLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut map = self.locks.map();
        // Only the map's own reference left: nobody holds or awaits it.
        if map
            .get(&self.device_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.device_id);
        }
    }
}
