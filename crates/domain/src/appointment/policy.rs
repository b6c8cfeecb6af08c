use async_trait::async_trait;
use chrono::NaiveDateTime;
use common::DoctorId;

use crate::error::DomainError;

/// Decides whether a doctor can be booked at a given time.
///
/// When a scheduler is built with a policy, bookings the policy rejects fail
/// with `DoctorUnavailable`.
#[async_trait]
pub trait AvailabilityPolicy: Send + Sync {
    /// Returns true if the doctor accepts appointments at `at`.
    async fn is_available(&self, doctor_id: DoctorId, at: NaiveDateTime)
    -> Result<bool, DomainError>;
}
