//! Server-Sent Events (SSE) stream of realtime device snapshots.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use fleetsync_app::broadcaster::RealtimeBroadcaster;
use fleetsync_app::ports::DeviceStore;
use fleetsync_domain::id::ObserverId;

use crate::state::AppState;

/// SSE event name carried by every pushed snapshot.
pub const SENSOR_UPDATE_EVENT: &str = "sensorUpdate";

/// Observer subscription that unsubscribes itself when the client goes away.
struct ObserverStream<S>
where
    S: DeviceStore + Send + Sync + 'static,
{
    id: ObserverId,
    inner: ReceiverStream<String>,
    broadcaster: Arc<RealtimeBroadcaster<S>>,
}

impl<S> Stream for ObserverStream<S>
where
    S: DeviceStore + Send + Sync + 'static,
{
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<S> Drop for ObserverStream<S>
where
    S: DeviceStore + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.id);
    }
}

/// `GET /api/devices/stream`: SSE stream of realtime device snapshots.
///
/// Subscribes a new observer on connect. Each broadcast is sent as a
/// `sensorUpdate` event whose data is the JSON device. The observer is
/// removed when the client disconnects.
pub async fn stream<S>(
    State(state): State<AppState<S>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: DeviceStore + Send + Sync + 'static,
{
    let subscription = state.broadcaster.subscribe();
    tracing::debug!(observer = %subscription.id, "sse observer connected");

    let observer = ObserverStream {
        id: subscription.id,
        inner: ReceiverStream::new(subscription.receiver),
        broadcaster: Arc::clone(&state.broadcaster),
    };
    let events = observer
        .map(|json| Ok::<_, Infallible>(Event::default().event(SENSOR_UPDATE_EVENT).data(json)));

    Sse::new(events).keep_alive(KeepAlive::default())
}
