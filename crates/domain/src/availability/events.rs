//! Availability domain events.

use common::{DoctorId, SlotId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::DomainEvent;

/// Events emitted by the availability manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AvailabilityEvent {
    /// A slot was added.
    SlotCreated { slot_id: SlotId, doctor_id: DoctorId },

    /// A slot's hours changed.
    SlotUpdated { slot_id: SlotId, doctor_id: DoctorId },

    /// A slot was removed.
    SlotDeleted { slot_id: SlotId },

    /// Every slot of a doctor was removed.
    SlotsDeletedForDoctor { doctor_id: DoctorId },
}

impl DomainEvent for AvailabilityEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AvailabilityEvent::SlotCreated { .. } => "SlotCreated",
            AvailabilityEvent::SlotUpdated { .. } => "SlotUpdated",
            AvailabilityEvent::SlotDeleted { .. } => "SlotDeleted",
            AvailabilityEvent::SlotsDeletedForDoctor { .. } => "SlotsDeletedForDoctor",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        match self {
            AvailabilityEvent::SlotsDeletedForDoctor { .. } => "Doctor",
            _ => "AvailabilitySlot",
        }
    }

    fn aggregate_id(&self) -> Uuid {
        match self {
            AvailabilityEvent::SlotCreated { slot_id, .. }
            | AvailabilityEvent::SlotUpdated { slot_id, .. }
            | AvailabilityEvent::SlotDeleted { slot_id } => slot_id.as_uuid(),
            AvailabilityEvent::SlotsDeletedForDoctor { doctor_id } => doctor_id.as_uuid(),
        }
    }
}
