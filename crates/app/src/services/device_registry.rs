//! Device registry — the single mutation gateway for devices.
//!
//! Every create and update is validated here, names are kept unique among
//! live devices, and timestamps are assigned here rather than by clients.

use std::str::FromStr;

use fleetsync_domain::device::{Device, DevicePayload};
use fleetsync_domain::error::{ConflictError, FleetError, NotFoundError};
use fleetsync_domain::id::DeviceId;
use fleetsync_domain::time::now;
use fleetsync_domain::validation::validate;

use crate::ports::DeviceStore;

/// Application service owning device CRUD and invariant enforcement.
pub struct DeviceRegistry<S> {
    store: S,
}

fn not_found(id: DeviceId) -> FleetError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
    .into()
}

impl<S: DeviceStore> DeviceRegistry<S> {
    /// Create a new registry backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validate `payload` and persist it as a new device.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::Validation`] with the first broken rule,
    /// [`FleetError::Conflict`] when the name is already used by a live
    /// device, or a storage error from the store.
    #[tracing::instrument(skip(self, payload), fields(device_name = payload.name.as_deref().unwrap_or_default()))]
    pub async fn create(&self, payload: DevicePayload) -> Result<Device, FleetError> {
        let valid = validate(&payload)?;

        if self.store.find_by_name(&valid.name).await?.is_some() {
            return Err(ConflictError { name: valid.name }.into());
        }

        let ts = now();
        let device = Device {
            id: DeviceId::new(),
            device_type: valid.device_type,
            name: valid.name,
            sensors: valid.sensors,
            created_at: ts,
            updated_at: ts,
        };
        let created = self.store.insert(device).await?;
        tracing::debug!(device_id = %created.id, "device created");
        Ok(created)
    }

    /// Look up a live device.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::InvalidId`] when `id` is malformed,
    /// [`FleetError::NotFound`] when no live device has it, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<Device, FleetError> {
        let id = DeviceId::from_str(id)?;
        self.store.find_by_id(id).await?.ok_or_else(|| not_found(id))
    }

    /// List every live device. No ordering is guaranteed.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the store.
    pub async fn list(&self) -> Result<Vec<Device>, FleetError> {
        self.store.find_all().await
    }

    /// Apply a partial update: fields absent from `payload` keep their
    /// current values, and the merged result is validated as a whole.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::InvalidId`] / [`FleetError::NotFound`] as in
    /// [`get`](Self::get), [`FleetError::Validation`] when the merged device
    /// breaks a rule, [`FleetError::Conflict`] when the new name belongs to
    /// another live device, or a storage error.
    #[tracing::instrument(skip(self, payload))]
    pub async fn update(&self, id: &str, payload: DevicePayload) -> Result<Device, FleetError> {
        let id = DeviceId::from_str(id)?;
        let existing = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found(id))?;

        let valid = validate(&payload.overlay(&existing))?;

        let holder = self.store.find_by_name(&valid.name).await?;
        if holder.is_some_and(|holder| holder.id != id) {
            return Err(ConflictError { name: valid.name }.into());
        }

        let device = Device {
            id,
            device_type: valid.device_type,
            name: valid.name,
            sensors: valid.sensors,
            created_at: existing.created_at,
            updated_at: now(),
        };
        // The record may have been deleted since it was read.
        self.store
            .update(device)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Permanently remove a device and return the removed record.
    ///
    /// # Errors
    ///
    /// Returns [`FleetError::InvalidId`] / [`FleetError::NotFound`] as in
    /// [`get`](Self::get), or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<Device, FleetError> {
        let id = DeviceId::from_str(id)?;
        let removed = self.store.delete(id).await?.ok_or_else(|| not_found(id))?;
        tracing::debug!(device_name = %removed.name, "device deleted");
        Ok(removed)
    }
}
