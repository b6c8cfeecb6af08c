//! Appointment records and their status lifecycle.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppointmentId, DoctorId, PatientId};

/// The status of an appointment in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──► Confirmed
///    │            │
///    └────────────┴──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AppointmentStatus {
    /// Booked, awaiting confirmation by the doctor.
    #[default]
    Pending,

    /// Confirmed by the doctor.
    Confirmed,

    /// Cancelled by the patient or the doctor (terminal state).
    Cancelled,
}

impl AppointmentStatus {
    /// Returns true if the appointment can be confirmed in this state.
    pub fn can_confirm(&self) -> bool {
        matches!(self, AppointmentStatus::Pending)
    }

    /// Returns true if the appointment can be cancelled in this state.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "Pending",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string does not name an appointment status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid appointment status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for AppointmentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(AppointmentStatus::Pending),
            "Confirmed" => Ok(AppointmentStatus::Confirmed),
            "Cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// A booked appointment between a patient and a doctor.
///
/// `date_time` is clinic-local wall-clock time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub date_time: NaiveDateTime,
    pub status: AppointmentStatus,
    pub comment: Option<String>,
    /// Set only when the doctor cancelled the appointment.
    pub cancellation_justification: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Creates a new pending appointment with a fresh id.
    pub fn new(
        patient_id: PatientId,
        doctor_id: DoctorId,
        date_time: NaiveDateTime,
        comment: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AppointmentId::new(),
            patient_id,
            doctor_id,
            date_time,
            status: AppointmentStatus::Pending,
            comment,
            cancellation_justification: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if both appointments book the same doctor at the same instant.
    pub fn collides_with(&self, other: &Appointment) -> bool {
        self.id != other.id && self.doctor_id == other.doctor_id && self.date_time == other.date_time
    }
}
