//! In-process device store backed by a mutex-guarded map.
//!
//! Each operation runs entirely under one lock acquisition, which gives the
//! per-operation atomicity the [`DeviceStore`] contract requires. Nothing is
//! persisted across restarts.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use fleetsync_domain::device::{Device, Sensor};
use fleetsync_domain::error::{ConflictError, FleetError};
use fleetsync_domain::id::DeviceId;
use fleetsync_domain::time::Timestamp;

use crate::ports::DeviceStore;

/// Volatile [`DeviceStore`] implementation.
#[derive(Default)]
pub struct InMemoryDeviceStore {
    devices: Mutex<HashMap<DeviceId, Device>>,
}

impl InMemoryDeviceStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceId, Device>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn name_taken(devices: &HashMap<DeviceId, Device>, name: &str, except: Option<DeviceId>) -> bool {
    devices
        .values()
        .any(|d| d.name == name && Some(d.id) != except)
}

impl DeviceStore for InMemoryDeviceStore {
    fn insert(&self, device: Device) -> impl Future<Output = Result<Device, FleetError>> + Send {
        let result = {
            let mut devices = self.lock();
            if name_taken(&devices, &device.name, None) {
                Err(ConflictError {
                    name: device.name.clone(),
                }
                .into())
            } else {
                devices.insert(device.id, device.clone());
                Ok(device)
            }
        };
        async { result }
    }

    fn find_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        let result = self.lock().get(&id).cloned();
        async { Ok(result) }
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<Device>, FleetError>> + Send {
        let result: Vec<Device> = self.lock().values().cloned().collect();
        async { Ok(result) }
    }

    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        let result = self.lock().values().find(|d| d.name == name).cloned();
        async { Ok(result) }
    }

    fn update(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        let result = {
            let mut devices = self.lock();
            if !devices.contains_key(&device.id) {
                Ok(None)
            } else if name_taken(&devices, &device.name, Some(device.id)) {
                Err(ConflictError {
                    name: device.name.clone(),
                }
                .into())
            } else {
                devices.insert(device.id, device.clone());
                Ok(Some(device))
            }
        };
        async { result }
    }

    fn delete(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        let result = self.lock().remove(&id);
        async { Ok(result) }
    }

    fn write_readings(
        &self,
        id: DeviceId,
        sensors: Vec<Sensor>,
        at: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        let result = self.lock().get_mut(&id).map(|device| {
            device.sensors = sensors;
            device.updated_at = at;
            device.clone()
        });
        async { Ok(result) }
    }
}
