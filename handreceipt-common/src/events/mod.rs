//! Import event types and the EventBus
//!
//! Events are broadcast while a batch runs so that HTTP subscribers or log
//! sinks can follow progress without touching the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Batch import lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ImportEvent {
    /// A batch passed request validation and is about to be reconciled
    BatchStarted {
        batch_id: Uuid,
        /// Parsed items before quantity expansion
        item_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// One unit was committed as a property record
    UnitCommitted {
        batch_id: Uuid,
        input_index: usize,
        unit_index: u32,
        property_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Batch finished (possibly cancelled) and the report is assembled
    BatchCompleted {
        batch_id: Uuid,
        created: usize,
        skipped: usize,
        invalid: usize,
        failed: usize,
        /// "success", "partial_success" or "failure"
        overall_status: String,
        cancelled: bool,
        timestamp: DateTime<Utc>,
    },
}

impl ImportEvent {
    /// Event type name (matches the serde tag)
    pub fn event_type(&self) -> &str {
        match self {
            ImportEvent::BatchStarted { .. } => "BatchStarted",
            ImportEvent::UnitCommitted { .. } => "UnitCommitted",
            ImportEvent::BatchCompleted { .. } => "BatchCompleted",
        }
    }

    pub fn batch_id(&self) -> Uuid {
        match self {
            ImportEvent::BatchStarted { batch_id, .. }
            | ImportEvent::UnitCommitted { batch_id, .. }
            | ImportEvent::BatchCompleted { batch_id, .. } => *batch_id,
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`: publishing never blocks, slow subscribers
/// observe `Lagged` instead of holding producers back.
///
/// ```
/// use handreceipt_common::events::{EventBus, ImportEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ImportEvent::BatchStarted {
///     batch_id: uuid::Uuid::new_v4(),
///     item_count: 3,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ImportEvent,
    ) -> Result<usize, broadcast::error::SendError<ImportEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ImportEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(batch_id: Uuid) -> ImportEvent {
        ImportEvent::BatchStarted {
            batch_id,
            item_count: 2,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus.emit(started(Uuid::new_v4())).is_err());
        // Lossy variant tolerates the same condition
        bus.emit_lossy(started(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let batch_id = Uuid::new_v4();

        bus.emit(started(batch_id)).unwrap();
        bus.emit(ImportEvent::BatchCompleted {
            batch_id,
            created: 1,
            skipped: 1,
            invalid: 0,
            failed: 0,
            overall_status: "partial_success".to_string(),
            cancelled: false,
            timestamp: Utc::now(),
        })
        .unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.event_type(), "BatchStarted");
        assert_eq!(second.event_type(), "BatchCompleted");
        assert_eq!(second.batch_id(), batch_id);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(started(Uuid::nil())).unwrap();
        assert_eq!(json["type"], "BatchStarted");
        assert_eq!(json["item_count"], 2);
    }
}
