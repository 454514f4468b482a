//! # fleetsync-domain
//!
//! Pure domain model for the fleetsync device state engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Devices** (typed IoT devices owning an ordered list of sensors)
//! - Define **Device payloads** (loosely-shaped create/update input)
//! - Contain the **validation rules** that every mutation must pass
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod device;
pub mod validation;
