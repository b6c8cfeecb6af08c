//! Domain event trait and the hand-off of emitted events to an [`EventSink`].

use std::sync::Arc;

use serde::Serialize;
use store::{EventEnvelope, EventSink};
use uuid::Uuid;

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + Send + Sync + Clone {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the type name of the aggregate that emitted the event.
    fn aggregate_type(&self) -> &'static str;

    /// Returns the id of the aggregate that emitted the event.
    fn aggregate_id(&self) -> Uuid;

    /// Wraps the event in an envelope ready for a sink.
    fn to_envelope(&self) -> Result<EventEnvelope, serde_json::Error> {
        Ok(EventEnvelope::new(
            self.event_type(),
            self.aggregate_type(),
            self.aggregate_id(),
            serde_json::to_value(self)?,
        ))
    }
}

/// Publishes domain events to a sink.
///
/// Publishing happens after the write has committed, so a failure here is
/// logged and counted but never turned into a failed command.
#[derive(Clone)]
pub struct EventPublisher {
    sink: Arc<dyn EventSink>,
}

impl EventPublisher {
    /// Creates a publisher over the given sink.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Serializes and hands the events to the sink.
    pub async fn publish<E: DomainEvent>(&self, events: &[E]) {
        if events.is_empty() {
            return;
        }

        let envelopes = match events
            .iter()
            .map(DomainEvent::to_envelope)
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(envelopes) => envelopes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize domain events");
                metrics::counter!("events_publish_failures_total").increment(events.len() as u64);
                return;
            }
        };

        let count = envelopes.len() as u64;
        match self.sink.publish(envelopes).await {
            Ok(()) => {
                metrics::counter!("events_published_total").increment(count);
            }
            Err(e) => {
                tracing::error!(error = %e, count, "Failed to publish domain events");
                metrics::counter!("events_publish_failures_total").increment(count);
            }
        }
    }
}
