//! # fleetsyncd — fleetsync daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialize logging
//! - Open the device store (`SQLite` with migrations, or in-memory)
//! - Construct the device registry and realtime broadcaster
//! - Start the mutation simulator and the broadcaster on their own timers
//! - Build the axum router and serve it
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fleetsync_adapter_http_axum::state::AppState;
use fleetsync_adapter_simulator::MutationSimulator;
use fleetsync_adapter_storage_sqlite_sqlx::Config as DatabaseConfig;
use fleetsync_app::broadcaster::RealtimeBroadcaster;
use fleetsync_app::memory_store::InMemoryDeviceStore;
use fleetsync_app::ports::DeviceStore;
use fleetsync_app::services::device_registry::DeviceRegistry;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let ctx = CancellationToken::new();
    tokio::spawn(cancel_on_signal(ctx.clone()));

    if config.uses_memory_store() {
        tracing::warn!("using the in-memory store, devices are lost on restart");
        serve(&config, Arc::new(InMemoryDeviceStore::new()), ctx).await
    } else {
        let db = DatabaseConfig {
            database_url: config.database_url().to_string(),
        }
        .build()
        .await?;
        serve(&config, db.device_store(), ctx).await
    }
}

async fn serve<S>(
    config: &Config,
    store: S,
    ctx: CancellationToken,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: DeviceStore + Clone + Send + Sync + 'static,
{
    let registry = Arc::new(DeviceRegistry::new(store.clone()));
    let broadcaster = Arc::new(RealtimeBroadcaster::new(
        Arc::clone(&registry),
        store,
        config.broadcaster_config()?,
    ));

    let mut tasks = Vec::new();
    if config.simulator.enabled {
        let simulator = Arc::new(MutationSimulator::new(
            Arc::clone(&registry),
            config.simulator_config(),
        ));
        tasks.push(simulator.start(ctx.clone()));
    } else {
        tracing::info!("mutation simulator disabled");
    }
    if config.broadcaster.enabled {
        tasks.push(Arc::clone(&broadcaster).start(ctx.clone()));
    } else {
        tracing::info!("realtime broadcaster disabled");
    }

    let app = fleetsync_adapter_http_axum::router::build(AppState::new(
        registry,
        Arc::clone(&broadcaster),
    ));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "fleetsyncd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            ctx.cancelled().await;
            // Open SSE streams would otherwise keep the server draining forever.
            let observers = broadcaster.disconnect_all();
            tracing::info!(observers, "http server shutting down");
        })
        .await?;

    for task in tasks {
        if let Err(err) = task.await {
            tracing::error!(%err, "background task aborted");
        }
    }
    tracing::info!("fleetsyncd stopped");
    Ok(())
}

/// Cancel `ctx` on SIGINT, or SIGTERM on Unix.
async fn cancel_on_signal(ctx: CancellationToken) {
    let interrupt = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
    ctx.cancel();
}
