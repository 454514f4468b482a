//! # fleetsync-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **storage port** that adapters must implement:
//!   - `DeviceStore` — atomic per-operation device persistence
//! - Host the **driving** use-cases:
//!   - `DeviceRegistry` — validated CRUD, the only gateway for device writes
//!   - `RealtimeBroadcaster` — periodic re-sampling and observer fan-out
//! - Provide **in-process infrastructure** that doesn't need IO
//!   (`InMemoryDeviceStore`, random sensor readings)
//!
//! ## Dependency rule
//! Depends on `fleetsync-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod broadcaster;
pub mod memory_store;
pub mod ports;
pub mod readings;
pub mod services;
