//! Realtime broadcaster — on its own timer, re-samples one random live
//! device and pushes the fresh snapshot to every subscribed observer.
//!
//! In [`BroadcastMode::Bypass`] the new readings are written straight into
//! the store through [`DeviceStore::write_readings`], skipping registry
//! validation. [`BroadcastMode::Strict`] sends the same change through
//! [`DeviceRegistry::update`] instead.
//!
//! Delivery is fire-and-forget: each observer owns a bounded channel, a full
//! channel drops the snapshot for that observer only, and a closed channel
//! unsubscribes it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fleetsync_domain::device::{Device, DevicePayload, SensorPayload};
use fleetsync_domain::error::FleetError;
use fleetsync_domain::id::ObserverId;
use fleetsync_domain::time::now;

use crate::ports::DeviceStore;
use crate::readings::randomize;
use crate::services::device_registry::DeviceRegistry;

/// How the sample task applies its new readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BroadcastMode {
    /// Write readings directly into the store.
    #[default]
    Bypass,
    /// Route readings through the registry's validated update.
    Strict,
}

impl fmt::Display for BroadcastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bypass => f.write_str("bypass"),
            Self::Strict => f.write_str("strict"),
        }
    }
}

/// Returned when a string names no [`BroadcastMode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown broadcast mode '{0}', expected 'bypass' or 'strict'")]
pub struct UnknownBroadcastMode(pub String);

impl FromStr for BroadcastMode {
    type Err = UnknownBroadcastMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bypass" => Ok(Self::Bypass),
            "strict" => Ok(Self::Strict),
            _ => Err(UnknownBroadcastMode(s.to_string())),
        }
    }
}

/// Tunables for [`RealtimeBroadcaster`].
#[derive(Debug, Clone)]
pub struct BroadcasterConfig {
    /// Delay between two sample cycles.
    pub interval: Duration,
    pub mode: BroadcastMode,
    /// Per-observer channel capacity.
    pub observer_buffer: usize,
    /// Fixed RNG seed, for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            mode: BroadcastMode::Bypass,
            observer_buffer: 32,
            seed: None,
        }
    }
}

/// A live observer registration.
///
/// Each message is a JSON-serialized [`Device`] snapshot. Dropping the
/// receiver unsubscribes the observer on the next broadcast.
pub struct Subscription {
    pub id: ObserverId,
    pub receiver: mpsc::Receiver<String>,
}

/// Periodic sampler and observer fan-out.
pub struct RealtimeBroadcaster<S> {
    registry: Arc<DeviceRegistry<S>>,
    store: S,
    config: BroadcasterConfig,
    observers: Mutex<HashMap<ObserverId, mpsc::Sender<String>>>,
    rng: Mutex<StdRng>,
}

impl<S> RealtimeBroadcaster<S>
where
    S: DeviceStore + Send + Sync + 'static,
{
    /// Create a broadcaster reading through `registry` and, in bypass mode,
    /// writing through `store`.
    pub fn new(registry: Arc<DeviceRegistry<S>>, store: S, config: BroadcasterConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            registry,
            store,
            config,
            observers: Mutex::new(HashMap::new()),
            rng: Mutex::new(rng),
        }
    }

    fn observers(&self) -> MutexGuard<'_, HashMap<ObserverId, mpsc::Sender<String>>> {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new observer.
    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.config.observer_buffer.max(1));
        let id = ObserverId::new();
        let count = {
            let mut observers = self.observers();
            observers.insert(id, sender);
            observers.len()
        };
        tracing::debug!(observer = %id, observers = count, "observer subscribed");
        Subscription { id, receiver }
    }

    /// Remove an observer. Returns whether it was still subscribed.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let removed = self.observers().remove(&id).is_some();
        if removed {
            tracing::debug!(observer = %id, "observer unsubscribed");
        }
        removed
    }

    /// Number of currently subscribed observers.
    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    /// Drop every observer, closing their streams. Returns how many were
    /// connected.
    pub fn disconnect_all(&self) -> usize {
        let count = {
            let mut observers = self.observers();
            let count = observers.len();
            observers.clear();
            count
        };
        tracing::debug!(observers = count, "all observers disconnected");
        count
    }

    /// Run a single sample cycle.
    ///
    /// Returns the pushed snapshot, or `None` when there was nothing to
    /// sample (empty registry, or the picked device vanished mid-cycle).
    ///
    /// # Errors
    ///
    /// Returns a storage error, or a registry error in strict mode.
    pub async fn sample_once(&self) -> Result<Option<Device>, FleetError> {
        let devices = self.registry.list().await?;
        let picked = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            devices
                .choose(&mut *rng)
                .map(|device| (device.id, randomize(&device.sensors, &mut *rng)))
        };
        let Some((id, readings)) = picked else {
            tracing::trace!("no devices to sample");
            return Ok(None);
        };

        let sampled = match self.config.mode {
            BroadcastMode::Bypass => self.store.write_readings(id, readings, now()).await?,
            BroadcastMode::Strict => {
                let payload = DevicePayload {
                    sensors: Some(readings.into_iter().map(SensorPayload::from).collect()),
                    ..DevicePayload::default()
                };
                match self.registry.update(&id.to_string(), payload).await {
                    Ok(device) => Some(device),
                    Err(err) if err.is_not_found() => None,
                    Err(err) => return Err(err),
                }
            }
        };

        let Some(device) = sampled else {
            tracing::debug!(device_id = %id, "sampled device disappeared before write");
            return Ok(None);
        };

        let delivered = self.publish(&device);
        tracing::info!(
            device_id = %device.id,
            device_name = %device.name,
            delivered,
            "realtime update"
        );
        Ok(Some(device))
    }

    /// Push a snapshot to every observer, returning how many accepted it.
    fn publish(&self, device: &Device) -> usize {
        let json = match serde_json::to_string(device) {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(%err, device_id = %device.id, "failed to serialize device snapshot");
                return 0;
            }
        };

        let mut delivered = 0;
        self.observers()
            .retain(|id, sender| match sender.try_send(json.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(observer = %id, "observer lagging, snapshot dropped");
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(observer = %id, "observer gone, unsubscribing");
                    false
                }
            });
        delivered
    }

    /// Spawn the periodic sample task. It stops after `ctx` is cancelled,
    /// letting any in-flight cycle finish first.
    pub fn start(self: Arc<Self>, ctx: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(ctx))
    }

    async fn run(self: Arc<Self>, ctx: CancellationToken) {
        tracing::info!(
            interval_ms = self.config.interval.as_millis(),
            mode = %self.config.mode,
            "realtime broadcaster started"
        );
        loop {
            tokio::select! {
                () = ctx.cancelled() => break,
                () = tokio::time::sleep(self.config.interval) => {
                    if let Err(err) = self.sample_once().await {
                        tracing::warn!(%err, "realtime update failed, retrying next interval");
                    }
                }
            }
        }
        tracing::info!("realtime broadcaster stopped");
    }
}
