//! Live fan-out channel
//!
//! Provides the live event types and [`LiveHub`], an in-process room registry
//! keyed by normalized identity. Delivery is fire-and-forget: events published
//! to a room nobody listens on are dropped, and nothing is queued for clients
//! that connect later. The registry lives only as long as the process.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

use crate::identity::Identity;
use crate::models::{StudentRecords, TrackedEvent};

/// Events pushed to a student's live room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// Full snapshot sent on login
    Initial {
        records: Box<StudentRecords>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Event recorded through the live tracking endpoint
    Event { event: TrackedEvent },
}

impl LiveEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            LiveEvent::Initial { .. } => "initial",
            LiveEvent::Event { .. } => "event",
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("live room registry is poisoned")]
    RegistryPoisoned,
}

/// Publish side of the live channel, independent of transport
pub trait LiveChannel: Send + Sync {
    /// Deliver to every current subscriber of `identity`
    ///
    /// Returns the number of receivers reached; 0 is not an error.
    fn publish(&self, identity: &Identity, event: LiveEvent) -> Result<usize, PublishError>;
}

/// Per-identity broadcast rooms
#[derive(Clone)]
pub struct LiveHub {
    rooms: Arc<RwLock<HashMap<Identity, broadcast::Sender<LiveEvent>>>>,
    capacity: usize,
}

impl LiveHub {
    /// Creates a hub whose rooms buffer up to `capacity` events per slow receiver
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Join the room for `identity`, creating it on first use
    ///
    /// Rooms whose receivers have all gone away are removed first, so
    /// disconnected streams do not keep their room alive.
    pub fn subscribe(
        &self,
        identity: &Identity,
    ) -> Result<broadcast::Receiver<LiveEvent>, PublishError> {
        let mut rooms = self
            .rooms
            .write()
            .map_err(|_| PublishError::RegistryPoisoned)?;

        let before = rooms.len();
        rooms.retain(|_, sender| sender.receiver_count() > 0);
        if rooms.len() < before {
            debug!(removed = before - rooms.len(), "Idle live rooms removed");
        }

        let sender = rooms
            .entry(identity.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        debug!(identity = %identity, "Live subscriber joined");
        Ok(sender.subscribe())
    }

    /// Current receivers in a room
    pub fn subscriber_count(&self, identity: &Identity) -> usize {
        self.rooms
            .read()
            .ok()
            .and_then(|rooms| rooms.get(identity).map(|s| s.receiver_count()))
            .unwrap_or(0)
    }

    /// Number of rooms currently registered
    pub fn room_count(&self) -> usize {
        self.rooms.read().map(|rooms| rooms.len()).unwrap_or(0)
    }

    /// Get the configured per-room capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn drop_room_if_idle(&self, identity: &Identity) -> Result<(), PublishError> {
        let mut rooms = self
            .rooms
            .write()
            .map_err(|_| PublishError::RegistryPoisoned)?;
        if rooms
            .get(identity)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            rooms.remove(identity);
            debug!(identity = %identity, "Live room removed (no subscribers)");
        }
        Ok(())
    }
}

impl LiveChannel for LiveHub {
    fn publish(&self, identity: &Identity, event: LiveEvent) -> Result<usize, PublishError> {
        let sender = {
            let rooms = self
                .rooms
                .read()
                .map_err(|_| PublishError::RegistryPoisoned)?;
            rooms.get(identity).cloned()
        };

        let Some(sender) = sender else {
            return Ok(0);
        };

        match sender.send(event) {
            Ok(delivered) => {
                debug!(identity = %identity, delivered, "Live event published");
                Ok(delivered)
            }
            Err(_) => {
                // Every receiver went away
                self.drop_room_if_idle(identity)?;
                Ok(0)
            }
        }
    }
}
