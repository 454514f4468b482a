//! # fleetsync-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the **device REST API** under `/api/devices`
//! - Stream realtime device snapshots to observers over **Server-Sent Events**
//!   at `/api/devices/stream` (event name `sensorUpdate`)
//! - Map HTTP requests into registry calls (driving adapter)
//! - Map registry results into `{"status": …}` JSON envelopes
//!
//! ## Dependency rule
//! Depends on `fleetsync-app` (for port traits and services) and `fleetsync-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;
