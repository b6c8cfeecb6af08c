use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A domain event wrapped with the metadata the messaging collaborator needs.
///
/// The payload is the serialized event; `aggregate_id` is the id of the slot,
/// appointment, or doctor the event is about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier for this event.
    pub event_id: EventId,

    /// The type of the event (e.g., "SlotCreated", "AppointmentConfirmed").
    pub event_type: String,

    /// The aggregate this event is about.
    pub aggregate_id: Uuid,

    /// The type of aggregate (e.g., "AvailabilitySlot", "Appointment").
    pub aggregate_type: String,

    /// When the event was created.
    pub timestamp: DateTime<Utc>,

    /// The event payload as JSON.
    pub payload: serde_json::Value,

    /// Additional metadata about the event.
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EventEnvelope {
    /// Creates an envelope stamped with a fresh id and the current time.
    pub fn new(
        event_type: impl Into<String>,
        aggregate_type: impl Into<String>,
        aggregate_id: impl Into<Uuid>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: event_type.into(),
            aggregate_id: aggregate_id.into(),
            aggregate_type: aggregate_type.into(),
            timestamp: Utc::now(),
            payload,
            metadata: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_new_creates_unique_ids() {
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn new_envelope_carries_fields() {
        let aggregate_id = Uuid::new_v4();
        let payload = serde_json::json!({"slot_id": aggregate_id});

        let envelope = EventEnvelope::new(
            "SlotCreated",
            "AvailabilitySlot",
            aggregate_id,
            payload.clone(),
        );

        assert_eq!(envelope.event_type, "SlotCreated");
        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert_eq!(envelope.aggregate_type, "AvailabilitySlot");
        assert_eq!(envelope.payload, payload);
        assert!(envelope.metadata.is_empty());
    }

    #[test]
    fn envelope_serializes_event_id_as_plain_uuid() {
        let envelope = EventEnvelope::new(
            "SlotDeleted",
            "AvailabilitySlot",
            Uuid::new_v4(),
            serde_json::Value::Null,
        );

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event_id"], serde_json::json!(envelope.event_id.as_uuid()));
    }
}
