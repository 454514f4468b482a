//! Shared application state for axum handlers.

use std::sync::Arc;

use fleetsync_app::broadcaster::RealtimeBroadcaster;
use fleetsync_app::ports::DeviceStore;
use fleetsync_app::services::device_registry::DeviceRegistry;

/// Application state shared across all axum handlers.
///
/// Generic over the store type to avoid dynamic dispatch. `Clone` is
/// implemented manually so the store itself does not need to be `Clone`.
pub struct AppState<S> {
    /// Device CRUD gateway.
    pub registry: Arc<DeviceRegistry<S>>,
    /// Observer registry for the realtime stream.
    pub broadcaster: Arc<RealtimeBroadcaster<S>>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            broadcaster: Arc::clone(&self.broadcaster),
        }
    }
}

impl<S> AppState<S>
where
    S: DeviceStore + Send + Sync + 'static,
{
    /// Create the state from services already shared with background tasks.
    pub fn new(
        registry: Arc<DeviceRegistry<S>>,
        broadcaster: Arc<RealtimeBroadcaster<S>>,
    ) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }
}
