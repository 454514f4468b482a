//! # fleetsync-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the [`DeviceStore`](fleetsync_app::ports::DeviceStore) port
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! Name uniqueness is enforced by a `UNIQUE` constraint, so each store call
//! checks and writes in a single statement.
//!
//! ## Dependency rule
//! Depends on `fleetsync-app` (for port traits) and `fleetsync-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod device_store;
mod error;
mod pool;

pub use device_store::SqliteDeviceStore;
pub use error::StorageError;
pub use pool::{Config, Database};
