//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
pub mod sse;

use axum::Router;
use axum::routing::get;
use serde::Serialize;

use fleetsync_app::ports::DeviceStore;

use crate::state::AppState;

/// Success envelope wrapping every API payload.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    data: T,
}

impl<T> Envelope<T> {
    /// `{"status": "success", "data": …}`
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data,
        }
    }

    /// Same as [`success`](Self::success) with a human-readable message.
    pub fn with_message(message: &'static str, data: T) -> Self {
        Self {
            message: Some(message),
            ..Self::success(data)
        }
    }
}

/// Build the `/api` sub-router.
pub fn routes<S>() -> Router<AppState<S>>
where
    S: DeviceStore + Send + Sync + 'static,
{
    Router::new()
        .route("/devices", get(devices::list::<S>).post(devices::create::<S>))
        .route("/devices/stream", get(sse::stream::<S>))
        .route(
            "/devices/{id}",
            get(devices::get::<S>)
                .put(devices::update::<S>)
                .delete(devices::delete::<S>),
        )
}
