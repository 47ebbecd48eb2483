//! Live tracking and the per-identity update stream

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
    Json,
};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use spt_common::events::{LiveChannel, LiveEvent};
use spt_common::identity::Identity;
use spt_common::models::{EventRecord, TrackedEvent};
use spt_common::time;
use std::convert::Infallible;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiJson, ApiResult};
use crate::AppState;

/// Client-side event: a type plus arbitrary payload
#[derive(Debug, Deserialize)]
pub struct LiveEventBody {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub email: String,
    pub event: LiveEventBody,
}

#[derive(Debug, Serialize)]
pub struct TrackResponse {
    pub success: bool,
    pub message: String,
    pub event: TrackedEvent,
}

/// POST /api/live/track
///
/// Stores the event, then pushes it to the identity's live room. A failed
/// publish is logged and does not fail the request.
pub async fn track_live_event(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TrackRequest>,
) -> ApiResult<Json<TrackResponse>> {
    let identity = Identity::parse(&request.email)?;
    let event = TrackedEvent {
        id: Uuid::new_v4(),
        timestamp: time::now(),
        email: identity.as_str().to_string(),
        kind: request.event.kind,
        payload: request.event.payload,
    };

    let record = event.clone();
    state
        .store
        .transaction(move |store| {
            store.events.push(EventRecord::Tracked(record));
            Ok(())
        })
        .await?;

    match state.live.publish(&identity, LiveEvent::Event { event: event.clone() }) {
        Ok(delivered) => debug!(identity = %identity, delivered, "Tracked event published"),
        Err(e) => warn!(identity = %identity, "Live publish failed: {}", e),
    }

    Ok(Json(TrackResponse {
        success: true,
        message: "Event tracked".to_string(),
        event,
    }))
}

/// GET /api/live/:email
///
/// Server-Sent Events stream of the identity's live room. Nothing published
/// before the subscription is replayed.
pub async fn live_stream(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let identity = Identity::parse(&email)?;
    let rx = state.live.subscribe(&identity)?;
    Ok(spt_common::sse::live_event_stream(identity, rx))
}
