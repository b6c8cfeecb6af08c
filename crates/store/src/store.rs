use async_trait::async_trait;
use chrono::NaiveDateTime;
use common::{
    Appointment, AppointmentId, AppointmentStatus, AvailabilitySlot, DayOfWeek, DoctorId,
    PatientId, SlotId,
};

use crate::Result;

/// Persistence for recurring weekly availability slots.
///
/// Implementations enforce the no-overlap invariant atomically with the write:
/// `insert` and `update` fail with [`StoreError::SlotOverlap`] if the slot
/// would intersect another slot of the same doctor and day. Listings are
/// ordered by day (Sunday first) then start time.
///
/// [`StoreError::SlotOverlap`]: crate::StoreError::SlotOverlap
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Persists a new slot.
    async fn insert(&self, slot: AvailabilitySlot) -> Result<AvailabilitySlot>;

    /// Replaces an existing slot, matched by id.
    ///
    /// Fails with `NotFound` if no slot has this id.
    async fn update(&self, slot: AvailabilitySlot) -> Result<AvailabilitySlot>;

    /// Deletes a slot. Fails with `NotFound` if no slot has this id.
    async fn delete(&self, id: SlotId) -> Result<()>;

    /// Retrieves a slot by id.
    async fn get(&self, id: SlotId) -> Result<Option<AvailabilitySlot>>;

    /// Lists every slot, grouped by doctor.
    async fn list_all(&self) -> Result<Vec<AvailabilitySlot>>;

    /// Lists the slots of one doctor.
    async fn list_by_doctor(&self, doctor_id: DoctorId) -> Result<Vec<AvailabilitySlot>>;

    /// Lists the slots of one doctor on one day.
    async fn list_by_doctor_and_day(
        &self,
        doctor_id: DoctorId,
        day: DayOfWeek,
    ) -> Result<Vec<AvailabilitySlot>>;

    /// Lists the slots of every doctor on one day.
    async fn list_by_day(&self, day: DayOfWeek) -> Result<Vec<AvailabilitySlot>>;

    /// Deletes every slot of a doctor in one atomic step.
    ///
    /// Returns the number of slots removed.
    async fn delete_all_for_doctor(&self, doctor_id: DoctorId) -> Result<u64>;
}

/// Persistence for appointments.
///
/// Implementations enforce that a doctor has at most one appointment per exact
/// `date_time`: `insert` and `update` fail with [`StoreError::DoubleBooking`]
/// otherwise, atomically with the write.
///
/// [`StoreError::DoubleBooking`]: crate::StoreError::DoubleBooking
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Persists a new appointment.
    async fn insert(&self, appointment: Appointment) -> Result<Appointment>;

    /// Rewrites the booking details of an existing appointment, matched by id.
    ///
    /// Only the patient, doctor, time, comment and `updated_at` are written;
    /// the stored status and cancellation justification are kept and returned.
    /// Fails with `NotFound` if no appointment has this id.
    async fn update(&self, appointment: Appointment) -> Result<Appointment>;

    /// Moves an appointment from `expected` to `status`, storing the
    /// justification alongside.
    ///
    /// Fails with `StatusConflict` if the stored status is no longer
    /// `expected`, so two racing transitions cannot both apply.
    async fn update_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        status: AppointmentStatus,
        justification: Option<String>,
    ) -> Result<Appointment>;

    /// Deletes an appointment. Fails with `NotFound` if no appointment has this id.
    async fn delete(&self, id: AppointmentId) -> Result<()>;

    /// Retrieves an appointment by id.
    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>>;

    /// Checks whether the doctor already has an appointment at exactly `date_time`,
    /// ignoring the appointment `excluding` if given.
    async fn exists_at(
        &self,
        doctor_id: DoctorId,
        date_time: NaiveDateTime,
        excluding: Option<AppointmentId>,
    ) -> Result<bool>;

    /// Lists a doctor's appointments ordered by time.
    async fn list_by_doctor(&self, doctor_id: DoctorId) -> Result<Vec<Appointment>>;

    /// Lists a patient's appointments ordered by time.
    async fn list_by_patient(&self, patient_id: PatientId) -> Result<Vec<Appointment>>;
}
