//! Storage port — the durable device store.
//!
//! Implementations must make every method atomic on its own: `insert` and
//! `update` enforce name uniqueness in the same step that writes the record,
//! so two racing writers can never both commit the same name. The registry
//! relies on this instead of holding any in-process lock.

use std::future::Future;
use std::sync::Arc;

use fleetsync_domain::device::{Device, Sensor};
use fleetsync_domain::error::FleetError;
use fleetsync_domain::id::DeviceId;
use fleetsync_domain::time::Timestamp;

/// Durable device record set.
pub trait DeviceStore {
    /// Persist a new device.
    ///
    /// Fails with [`FleetError::Conflict`] if another live device already
    /// uses the same name.
    fn insert(&self, device: Device) -> impl Future<Output = Result<Device, FleetError>> + Send;

    /// Look up a device by id.
    fn find_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send;

    /// Return every live device, in no particular order.
    fn find_all(&self) -> impl Future<Output = Result<Vec<Device>, FleetError>> + Send;

    /// Look up a device by its exact name.
    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send;

    /// Replace the stored record with the same id.
    ///
    /// Returns `None` when no such record exists, and fails with
    /// [`FleetError::Conflict`] if the new name belongs to another device.
    fn update(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send;

    /// Remove a record, returning it if it existed.
    fn delete(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send;

    /// Overwrite the sensor list of a record without any invariant checks.
    ///
    /// This is the raw write used by the realtime broadcaster in bypass mode
    /// and the only path that can skip registry validation. Returns `None`
    /// when the record no longer exists.
    fn write_readings(
        &self,
        id: DeviceId,
        sensors: Vec<Sensor>,
        at: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send;
}

impl<T: DeviceStore + Send + Sync> DeviceStore for Arc<T> {
    fn insert(&self, device: Device) -> impl Future<Output = Result<Device, FleetError>> + Send {
        (**self).insert(device)
    }

    fn find_by_id(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        (**self).find_by_id(id)
    }

    fn find_all(&self) -> impl Future<Output = Result<Vec<Device>, FleetError>> + Send {
        (**self).find_all()
    }

    fn find_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        (**self).find_by_name(name)
    }

    fn update(
        &self,
        device: Device,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        (**self).update(device)
    }

    fn delete(
        &self,
        id: DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        (**self).delete(id)
    }

    fn write_readings(
        &self,
        id: DeviceId,
        sensors: Vec<Sensor>,
        at: Timestamp,
    ) -> impl Future<Output = Result<Option<Device>, FleetError>> + Send {
        (**self).write_readings(id, sensors, at)
    }
}
