//! Appointment booking and lifecycle.

mod commands;
mod events;
mod policy;
mod service;

pub use commands::{CreateAppointment, UpdateAppointment};
pub use events::AppointmentEvent;
pub use policy::AvailabilityPolicy;
pub use service::AppointmentScheduler;

use chrono::NaiveDateTime;
use common::{AppointmentStatus, DoctorId};
use thiserror::Error;

/// Errors that can occur during appointment operations.
#[derive(Debug, Error)]
pub enum AppointmentError {
    /// Appointment ID is required.
    #[error("Appointment ID is required")]
    AppointmentIdRequired,

    /// Patient ID is required.
    #[error("Patient ID is required")]
    PatientIdRequired,

    /// Doctor ID is required.
    #[error("Doctor ID is required")]
    DoctorIdRequired,

    /// A doctor cancellation needs a reason.
    #[error("Cancellation justification is required")]
    JustificationRequired,

    /// The doctor already has an appointment at this instant.
    #[error("Double booking: doctor {doctor_id} already has an appointment at {date_time}")]
    DoubleBooking {
        doctor_id: DoctorId,
        date_time: NaiveDateTime,
    },

    /// The doctor has no slot open at the requested time.
    #[error("Doctor {doctor_id} is not available at {date_time}")]
    DoctorUnavailable {
        doctor_id: DoctorId,
        date_time: NaiveDateTime,
    },

    /// Appointment is not in a state that allows the action.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidStateTransition {
        current: AppointmentStatus,
        action: &'static str,
    },

    /// The status changed between reading and writing the appointment.
    #[error("Appointment status changed concurrently: expected {expected}, found {actual}")]
    StatusChanged { expected: String, actual: String },
}

impl AppointmentError {
    /// Returns true for errors caused by existing state rather than bad input.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AppointmentError::DoubleBooking { .. }
                | AppointmentError::DoctorUnavailable { .. }
                | AppointmentError::InvalidStateTransition { .. }
                | AppointmentError::StatusChanged { .. }
        )
    }
}
