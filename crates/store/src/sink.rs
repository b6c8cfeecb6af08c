use async_trait::async_trait;

use crate::{EventEnvelope, Result};

/// Destination for domain events emitted by the scheduling services.
///
/// The messaging collaborator that turns events into notifications lives
/// outside this workspace; a sink is the hand-off point. Envelopes in a
/// single call are published in order.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publishes a batch of events.
    async fn publish(&self, events: Vec<EventEnvelope>) -> Result<()>;
}

/// Sink that only logs each event.
///
/// Useful when no messaging collaborator is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn publish(&self, events: Vec<EventEnvelope>) -> Result<()> {
        for event in events {
            tracing::info!(
                event_id = %event.event_id,
                event_type = %event.event_type,
                aggregate_type = %event.aggregate_type,
                aggregate_id = %event.aggregate_id,
                payload = %event.payload,
                "domain event"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracing_sink_accepts_any_batch() {
        let sink = TracingEventSink;
        let event = EventEnvelope::new(
            "SlotDeleted",
            "AvailabilitySlot",
            uuid::Uuid::new_v4(),
            serde_json::json!({}),
        );

        assert!(sink.publish(vec![event]).await.is_ok());
        assert!(sink.publish(vec![]).await.is_ok());
    }
}
