//! Server-Sent Events (SSE) utilities
//!
//! Turns a live room subscription into an axum SSE response.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::events::LiveEvent;
use crate::identity::Identity;

/// Heartbeat interval for live streams
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Create the SSE stream for one live room subscription
///
/// Sends a `ConnectionStatus` event first, then every [`LiveEvent`] as JSON
/// under its event type. Lagged receivers skip the missed events and keep going.
///
/// # Example
/// ```rust,ignore
/// pub async fn live_stream(
///     State(state): State<AppState>,
///     Path(email): Path<String>,
/// ) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
///     let identity = Identity::parse(&email)?;
///     let rx = state.live.subscribe(&identity)?;
///     Ok(spt_common::sse::live_event_stream(identity, rx))
/// }
/// ```
pub fn live_event_stream(
    identity: Identity,
    rx: broadcast::Receiver<LiveEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(identity = %identity, "New SSE client connected to live room");

    let connected = stream::once(async {
        Ok::<_, Infallible>(Event::default().event("ConnectionStatus").data("connected"))
    });

    let updates = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(event) => Event::default()
                .event(event.event_type())
                .json_data(&event)
                .ok()
                .map(Ok),
            Err(e) => {
                warn!("SSE client lagged: {:?}", e);
                None
            }
        }
    });

    Sse::new(connected.chain(updates)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("heartbeat"),
    )
}
