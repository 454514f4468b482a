//! # fleetsync-adapter-simulator
//!
//! Autonomous mutation source that exercises the device registry exactly as
//! an external client would.
//!
//! ## Periodic tasks
//!
//! | Task | Default period | Behaviour |
//! |------|----------------|-----------|
//! | Spawn | 30 s | Creates a random device and starts tracking it |
//! | Mutate | 10 s | Re-rolls every reading of one tracked device |
//! | Retire | 60 s | Deletes one tracked device |
//!
//! The tracking set is a private, possibly stale cache of the devices this
//! simulator created. It is never re-synchronised with the registry: an
//! entry is only evicted once a delete confirms the device is gone.
//!
//! ## Dependency rule
//!
//! Depends on `fleetsync-app` (registry and port traits) and
//! `fleetsync-domain` only.

mod generator;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fleetsync_app::ports::DeviceStore;
use fleetsync_app::readings::randomize;
use fleetsync_app::services::device_registry::DeviceRegistry;
use fleetsync_domain::device::{Device, DevicePayload};
use fleetsync_domain::error::FleetError;
use fleetsync_domain::id::DeviceId;

pub use generator::{NAME_PREFIX, random_name, random_payload};

/// Simulator timing and capacity.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub create_interval: Duration,
    pub update_interval: Duration,
    pub delete_interval: Duration,
    /// Upper bound of the tracking set. The spawn task idles while full.
    pub max_tracked: usize,
    /// Fixed RNG seed, for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            create_interval: Duration::from_secs(30),
            update_interval: Duration::from_secs(10),
            delete_interval: Duration::from_secs(60),
            max_tracked: 256,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Spawn,
    Mutate,
    Retire,
}

impl Task {
    const ALL: [Self; 3] = [Self::Spawn, Self::Mutate, Self::Retire];
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn => f.write_str("spawn"),
            Self::Mutate => f.write_str("mutate"),
            Self::Retire => f.write_str("retire"),
        }
    }
}

/// Synthetic client creating, updating, and deleting devices on timers.
pub struct MutationSimulator<S> {
    registry: Arc<DeviceRegistry<S>>,
    config: SimulatorConfig,
    rng: Mutex<StdRng>,
    tracked: Mutex<BTreeMap<DeviceId, Device>>,
}

impl<S> MutationSimulator<S>
where
    S: DeviceStore + Send + Sync + 'static,
{
    pub fn new(registry: Arc<DeviceRegistry<S>>, config: SimulatorConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            registry,
            config,
            rng: Mutex::new(rng),
            tracked: Mutex::new(BTreeMap::new()),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tracking(&self) -> MutexGuard<'_, BTreeMap<DeviceId, Device>> {
        self.tracked.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the tracking set, ordered by id.
    pub fn tracked(&self) -> Vec<Device> {
        self.tracking().values().cloned().collect()
    }

    fn pick_tracked(&self) -> Option<Device> {
        let tracked = self.tracking();
        if tracked.is_empty() {
            return None;
        }
        let index = self.rng().random_range(0..tracked.len());
        tracked.values().nth(index).cloned()
    }

    /// Create one random device and track it.
    ///
    /// Returns `None` without calling the registry when the tracking set is
    /// full.
    ///
    /// # Errors
    ///
    /// Returns any registry error. Nothing is tracked in that case.
    pub async fn spawn_once(&self) -> Result<Option<Device>, FleetError> {
        if self.tracking().len() >= self.config.max_tracked {
            tracing::debug!(max_tracked = self.config.max_tracked, "tracking set full");
            return Ok(None);
        }

        let payload = random_payload(&mut *self.rng());
        let created = self.registry.create(payload).await?;
        self.tracking().insert(created.id, created.clone());
        tracing::info!(
            device_id = %created.id,
            device_name = %created.name,
            device_type = %created.device_type,
            "simulated device created"
        );
        Ok(Some(created))
    }

    /// Re-roll the readings of one tracked device.
    ///
    /// The update is built from the local snapshot's type and name, without
    /// re-reading the registry first. Returns `None` when nothing is tracked.
    ///
    /// # Errors
    ///
    /// Returns any registry error. A device that vanished stays tracked.
    pub async fn mutate_once(&self) -> Result<Option<Device>, FleetError> {
        let Some(snapshot) = self.pick_tracked() else {
            return Ok(None);
        };
        let sensors = randomize(&snapshot.sensors, &mut *self.rng());
        let payload = DevicePayload::new(snapshot.device_type, snapshot.name.clone(), sensors);

        let updated = self
            .registry
            .update(&snapshot.id.to_string(), payload)
            .await?;

        let mut tracked = self.tracking();
        if let Some(entry) = tracked.get_mut(&updated.id) {
            entry.clone_from(&updated);
        }
        drop(tracked);

        tracing::info!(
            device_id = %updated.id,
            device_name = %updated.name,
            "simulated device updated"
        );
        Ok(Some(updated))
    }

    /// Delete one tracked device and forget it.
    ///
    /// A device that is already gone is forgotten as well. Returns the
    /// evicted id, or `None` when nothing is tracked.
    ///
    /// # Errors
    ///
    /// Returns any registry error other than not-found. The entry stays
    /// tracked in that case.
    pub async fn retire_once(&self) -> Result<Option<DeviceId>, FleetError> {
        let Some(snapshot) = self.pick_tracked() else {
            return Ok(None);
        };

        match self.registry.delete(&snapshot.id.to_string()).await {
            Ok(removed) => {
                tracing::info!(
                    device_id = %removed.id,
                    device_name = %removed.name,
                    "simulated device deleted"
                );
            }
            Err(err) if err.is_not_found() => {
                tracing::debug!(device_id = %snapshot.id, "tracked device already gone");
            }
            Err(err) => return Err(err),
        }

        self.tracking().remove(&snapshot.id);
        Ok(Some(snapshot.id))
    }

    /// Spawn the three periodic tasks. The returned handle resolves once all
    /// of them have stopped after `ctx` is cancelled.
    pub fn start(self: Arc<Self>, ctx: CancellationToken) -> JoinHandle<()> {
        let handles = Task::ALL.map(|task| tokio::spawn(Arc::clone(&self).run(task, ctx.clone())));
        tokio::spawn(async move {
            for handle in handles {
                if let Err(err) = handle.await {
                    tracing::error!(%err, "simulator task aborted");
                }
            }
        })
    }

    async fn run(self: Arc<Self>, task: Task, ctx: CancellationToken) {
        let period = match task {
            Task::Spawn => self.config.create_interval,
            Task::Mutate => self.config.update_interval,
            Task::Retire => self.config.delete_interval,
        };
        tracing::info!(%task, period_ms = period.as_millis(), "simulator task started");
        loop {
            tokio::select! {
                () = ctx.cancelled() => break,
                () = tokio::time::sleep(period) => {
                    let outcome = match task {
                        Task::Spawn => self.spawn_once().await.map(drop),
                        Task::Mutate => self.mutate_once().await.map(drop),
                        Task::Retire => self.retire_once().await.map(drop),
                    };
                    if let Err(err) = outcome {
                        tracing::warn!(%task, %err, "simulator cycle failed");
                    }
                }
            }
        }
        tracing::info!(%task, "simulator task stopped");
    }
}
