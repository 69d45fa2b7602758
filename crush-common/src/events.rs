//! Event types for the Crush client event system
//!
//! Session transitions are published synchronously on a broadcast bus so that
//! every consumer (navigation, views, logging) observes them immediately.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::routes::Route;

/// Client event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// A session was established (login or identity exchange)
    SessionStarted {
        identity: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The session was cleared (explicit logout)
    SessionEnded {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Navigation request for the view router
    Navigate {
        route: Route,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ClientEvent {
    /// Get event type as string, for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::SessionStarted { .. } => "SessionStarted",
            ClientEvent::SessionEnded { .. } => "SessionEnded",
            ClientEvent::Navigate { .. } => "Navigate",
        }
    }

    pub fn session_started(identity: impl Into<String>) -> Self {
        ClientEvent::SessionStarted {
            identity: identity.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn session_ended() -> Self {
        ClientEvent::SessionEnded {
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn navigate(route: Route) -> Self {
        ClientEvent::Navigate {
            route,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Broadcast bus for client events
///
/// Cloning the bus yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    ///
    /// # Examples
    ///
    /// ```
    /// use crush_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(64);
    /// assert_eq!(event_bus.capacity(), 64);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ClientEvent,
    ) -> Result<usize, broadcast::error::SendError<ClientEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ClientEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Client event emitted with no subscribers");
        }
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
