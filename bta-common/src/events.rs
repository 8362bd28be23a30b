//! Event types for the BTA event system
//!
//! Provides shared event definitions and the EventBus used to fan out
//! store-side changes to live subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// BTA event types
///
/// Events are broadcast via EventBus and can be serialized for SSE
/// transmission. All events use this central enum for type safety and
/// exhaustive matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriageEvent {
    /// A principal signed in and the session transitioned to logged-in
    ///
    /// Triggers:
    /// - Record browsers: open a fresh owner-scoped subscription
    PrincipalSignedIn {
        /// User id of the new principal
        user_id: String,
        /// Email of the new principal
        email: String,
        /// When the transition happened
        timestamp: DateTime<Utc>,
    },

    /// The session transitioned to logged-out
    ///
    /// Triggers:
    /// - Record browsers: cancel the active subscription
    PrincipalSignedOut {
        /// When the transition happened
        timestamp: DateTime<Utc>,
    },

    /// The inference endpoint returned a diagnosis for an uploaded scan
    ///
    /// Informational only; the result itself travels through the one-shot
    /// hand-off slot, not the bus.
    AnalysisCompleted {
        /// Diagnosis label returned by the model
        label: String,
        /// Confidence percentage (0-100)
        confidence: f64,
        /// When the analysis completed
        timestamp: DateTime<Utc>,
    },

    /// A new intake record was committed to the store
    ///
    /// Triggers:
    /// - Record subscriptions: re-emit a full snapshot for the owner
    RecordAppended {
        /// Store-assigned record id
        record_id: String,
        /// Owner the record is scoped to
        owner_id: String,
        /// Store-assigned creation time
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use bta_common::events::{EventBus, TriageEvent};
/// use std::sync::Arc;
///
/// let event_bus = Arc::new(EventBus::new(100));
///
/// // Subscribe to events
/// let mut rx = event_bus.subscribe();
///
/// // Emit an event
/// event_bus.emit(TriageEvent::RecordAppended {
///     record_id: "r-1".to_string(),
///     owner_id: "u-1".to_string(),
///     timestamp: chrono::Utc::now(),
/// }).ok();
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TriageEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TriageEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TriageEvent,
    ) -> Result<usize, broadcast::error::SendError<TriageEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Useful for non-critical events where it's acceptable if no component
    /// is currently listening.
    pub fn emit_lossy(&self, event: TriageEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    ///
    /// Useful for debugging and monitoring
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
