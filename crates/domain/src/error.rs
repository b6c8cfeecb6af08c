//! Domain error types.

use store::StoreError;
use thiserror::Error;
use uuid::Uuid;

use crate::appointment::AppointmentError;
use crate::availability::AvailabilityError;

/// Coarse classification of a [`DomainError`], used by callers to pick a
/// response without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is malformed.
    Validation,
    /// The referenced record does not exist.
    NotFound,
    /// The request is well formed but clashes with current state.
    Conflict,
    /// Anything else: storage failures, corrupt data.
    Internal,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error raised by the availability manager.
    #[error("{0}")]
    Availability(AvailabilityError),

    /// An error raised by the appointment scheduler.
    #[error("{0}")]
    Appointment(AppointmentError),

    /// The referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// An error occurred in the underlying store.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Availability(e) if e.is_conflict() => ErrorKind::Conflict,
            DomainError::Appointment(e) if e.is_conflict() => ErrorKind::Conflict,
            DomainError::Availability(_) | DomainError::Appointment(_) => ErrorKind::Validation,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for a missing slot.
    pub fn slot_not_found(id: impl Into<Uuid>) -> Self {
        DomainError::NotFound {
            entity: "Slot",
            id: id.into(),
        }
    }

    /// Shorthand for a missing appointment.
    pub fn appointment_not_found(id: impl Into<Uuid>) -> Self {
        DomainError::NotFound {
            entity: "Appointment",
            id: id.into(),
        }
    }
}

impl From<AvailabilityError> for DomainError {
    fn from(e: AvailabilityError) -> Self {
        DomainError::Availability(e)
    }
}

impl From<AppointmentError> for DomainError {
    fn from(e: AppointmentError) -> Self {
        DomainError::Appointment(e)
    }
}

/// Store invariant violations become the matching domain conflicts, so a
/// write that lost a race reports the same error as one caught by a pre-check.
impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SlotOverlap { doctor_id, day } => {
                AvailabilityError::Overlap { doctor_id, day }.into()
            }
            StoreError::DoubleBooking {
                doctor_id,
                date_time,
            } => AppointmentError::DoubleBooking {
                doctor_id,
                date_time,
            }
            .into(),
            StoreError::StatusConflict {
                expected, actual, ..
            } => AppointmentError::StatusChanged { expected, actual }.into(),
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            other => DomainError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use common::{DayOfWeek, DoctorId};

    #[test]
    fn store_conflicts_map_to_conflict_kind() {
        let overlap: DomainError = StoreError::SlotOverlap {
            doctor_id: DoctorId::new(),
            day: DayOfWeek::Monday,
        }
        .into();
        assert_eq!(overlap.kind(), ErrorKind::Conflict);

        let double_booking: DomainError = StoreError::DoubleBooking {
            doctor_id: DoctorId::new(),
            date_time: NaiveDate::from_ymd_opt(2025, 5, 5)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
        .into();
        assert_eq!(double_booking.kind(), ErrorKind::Conflict);
        assert!(matches!(
            double_booking,
            DomainError::Appointment(AppointmentError::DoubleBooking { .. })
        ));
    }

    #[test]
    fn store_not_found_keeps_entity() {
        let id = Uuid::new_v4();
        let err: DomainError = StoreError::NotFound {
            entity: "Slot",
            id,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), format!("Slot not found: {id}"));
    }

    #[test]
    fn other_store_errors_are_internal() {
        let err: DomainError = StoreError::Decode("bad day".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn validation_errors_are_validation_kind() {
        let err: DomainError = AppointmentError::JustificationRequired.into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
