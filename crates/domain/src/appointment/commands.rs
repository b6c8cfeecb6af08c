//! Appointment commands.

use chrono::NaiveDateTime;
use common::{DoctorId, PatientId};

use super::AppointmentError;

/// Command to book an appointment.
#[derive(Debug, Clone)]
pub struct CreateAppointment {
    /// The patient being seen.
    pub patient_id: PatientId,

    /// The doctor being booked.
    pub doctor_id: DoctorId,

    /// Clinic-local start of the appointment.
    pub date_time: NaiveDateTime,

    /// Free-text note from the patient.
    pub comment: Option<String>,
}

impl CreateAppointment {
    /// Creates a new CreateAppointment command.
    pub fn new(patient_id: PatientId, doctor_id: DoctorId, date_time: NaiveDateTime) -> Self {
        Self {
            patient_id,
            doctor_id,
            date_time,
            comment: None,
        }
    }

    /// Attaches a comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<(), AppointmentError> {
        validate_parties(self.patient_id, self.doctor_id)
    }
}

/// Command to change the booked details of an appointment.
///
/// Status and cancellation justification are only changed by the lifecycle
/// operations.
#[derive(Debug, Clone)]
pub struct UpdateAppointment {
    /// The patient being seen.
    pub patient_id: PatientId,

    /// The doctor being booked.
    pub doctor_id: DoctorId,

    /// Clinic-local start of the appointment.
    pub date_time: NaiveDateTime,

    /// Free-text note from the patient.
    pub comment: Option<String>,
}

impl UpdateAppointment {
    /// Creates a new UpdateAppointment command.
    pub fn new(
        patient_id: PatientId,
        doctor_id: DoctorId,
        date_time: NaiveDateTime,
        comment: Option<String>,
    ) -> Self {
        Self {
            patient_id,
            doctor_id,
            date_time,
            comment,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), AppointmentError> {
        validate_parties(self.patient_id, self.doctor_id)
    }
}

fn validate_parties(patient_id: PatientId, doctor_id: DoctorId) -> Result<(), AppointmentError> {
    if patient_id.is_nil() {
        return Err(AppointmentError::PatientIdRequired);
    }
    if doctor_id.is_nil() {
        return Err(AppointmentError::DoctorIdRequired);
    }
    Ok(())
}
