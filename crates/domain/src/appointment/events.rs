//! Appointment domain events.

use chrono::NaiveDateTime;
use common::{AppointmentId, DoctorId, PatientId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::DomainEvent;

/// Events emitted by the appointment scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AppointmentEvent {
    /// An appointment was booked.
    AppointmentCreated {
        appointment_id: AppointmentId,
        patient_id: PatientId,
        doctor_id: DoctorId,
        date_time: NaiveDateTime,
    },

    /// The booked details changed.
    AppointmentUpdated { appointment_id: AppointmentId },

    /// The doctor confirmed the appointment.
    AppointmentConfirmed { appointment_id: AppointmentId },

    /// The patient cancelled the appointment.
    AppointmentCancelled { appointment_id: AppointmentId },

    /// The doctor cancelled the appointment.
    AppointmentCancelledByDoctor {
        appointment_id: AppointmentId,
        justification: String,
    },

    /// The appointment record was removed.
    AppointmentDeleted { appointment_id: AppointmentId },
}

impl AppointmentEvent {
    /// Returns the appointment this event is about.
    pub fn appointment_id(&self) -> AppointmentId {
        match self {
            AppointmentEvent::AppointmentCreated { appointment_id, .. }
            | AppointmentEvent::AppointmentUpdated { appointment_id }
            | AppointmentEvent::AppointmentConfirmed { appointment_id }
            | AppointmentEvent::AppointmentCancelled { appointment_id }
            | AppointmentEvent::AppointmentCancelledByDoctor { appointment_id, .. }
            | AppointmentEvent::AppointmentDeleted { appointment_id } => *appointment_id,
        }
    }
}

impl DomainEvent for AppointmentEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AppointmentEvent::AppointmentCreated { .. } => "AppointmentCreated",
            AppointmentEvent::AppointmentUpdated { .. } => "AppointmentUpdated",
            AppointmentEvent::AppointmentConfirmed { .. } => "AppointmentConfirmed",
            AppointmentEvent::AppointmentCancelled { .. } => "AppointmentCancelled",
            AppointmentEvent::AppointmentCancelledByDoctor { .. } => {
                "AppointmentCancelledByDoctor"
            }
            AppointmentEvent::AppointmentDeleted { .. } => "AppointmentDeleted",
        }
    }

    fn aggregate_type(&self) -> &'static str {
        "Appointment"
    }

    fn aggregate_id(&self) -> Uuid {
        self.appointment_id().as_uuid()
    }
}
