//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`FleetError`]
//! via `#[from]`, so callers can always tell a bad payload from a missing
//! device from a storage outage.

/// Top-level error returned by every device registry operation.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// The identifier is not syntactically well-formed.
    #[error(transparent)]
    InvalidId(#[from] InvalidIdError),

    /// The request payload has an unusable shape (e.g. not a JSON object).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The payload breaks a device invariant.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Another live device already uses the requested name.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// The targeted device does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The durable store failed.
    #[error("storage error: {0}")]
    Storage(Box<dyn std::error::Error + Send + Sync>),
}

/// First rule a device payload breaks, in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid device type")]
    InvalidType,

    #[error("Device name must be at least 3 characters long")]
    InvalidName,

    #[error("Device must have at least one sensor")]
    MissingSensors,

    #[error("Sensor name must be at least 3 characters long (sensor #{index})")]
    InvalidSensorName { index: usize },

    #[error("Sensor value is required (sensor #{index})")]
    MissingSensorValue { index: usize },

    #[error("Sensor value must be a string or a number (sensor #{index})")]
    InvalidSensorValue { index: usize },
}

/// A lookup targeted a device that is not live.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A create or update would duplicate a live device name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("device name must be unique, '{name}' is already in use")]
pub struct ConflictError {
    pub name: String,
}

/// An identifier string could not be parsed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Invalid device ID format: {value}")]
pub struct InvalidIdError {
    pub value: String,
}

impl FleetError {
    /// Whether this error means the target device is gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
