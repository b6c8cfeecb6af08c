//! Appointment scheduler.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use common::{Appointment, AppointmentId, AppointmentStatus, DoctorId, PatientId};
use store::{AppointmentStore, EventSink};

use crate::command::CommandResult;
use crate::error::DomainError;
use crate::event::EventPublisher;

use super::{
    AppointmentError, AppointmentEvent, AvailabilityPolicy, CreateAppointment, UpdateAppointment,
};

/// Result of an appointment command.
pub type AppointmentResult<T> = Result<CommandResult<T, AppointmentEvent>, DomainError>;

/// Service for booking appointments and driving their lifecycle.
///
/// ```text
/// Pending ──► Confirmed
///    │            │
///    └────────────┴──► Cancelled
/// ```
///
/// The store rejects a second appointment for a doctor at the same instant
/// atomically; the scheduler pre-checks it to fail early.
pub struct AppointmentScheduler<S: AppointmentStore> {
    store: S,
    publisher: EventPublisher,
    policy: Option<Arc<dyn AvailabilityPolicy>>,
}

impl<S: AppointmentStore> AppointmentScheduler<S> {
    /// Creates a new scheduler over the given store, publishing to `sink`.
    pub fn new(store: S, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            publisher: EventPublisher::new(sink),
            policy: None,
        }
    }

    /// Rejects bookings the policy reports as outside the doctor's hours.
    pub fn with_availability_policy(mut self, policy: Arc<dyn AvailabilityPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Books a new pending appointment.
    #[tracing::instrument(skip(self))]
    pub async fn create(&self, cmd: CreateAppointment) -> AppointmentResult<Appointment> {
        cmd.validate()?;
        self.ensure_bookable(cmd.doctor_id, cmd.date_time, None)
            .await?;

        let appointment = Appointment::new(cmd.patient_id, cmd.doctor_id, cmd.date_time, cmd.comment);
        let appointment = self
            .store
            .insert(appointment)
            .await
            .map_err(|e| record_conflict(e.into()))?;

        metrics::counter!("appointments_created_total").increment(1);
        tracing::info!(
            appointment_id = %appointment.id,
            doctor_id = %appointment.doctor_id,
            date_time = %appointment.date_time,
            "Appointment created"
        );

        let event = AppointmentEvent::AppointmentCreated {
            appointment_id: appointment.id,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            date_time: appointment.date_time,
        };
        self.finish(appointment, event).await
    }

    /// Changes the patient, doctor, time, or comment of an appointment.
    ///
    /// The double-booking check is re-run for the new doctor and time,
    /// ignoring the appointment itself.
    /// Status and cancellation justification stay as the store holds them,
    /// even if a transition commits while this update is in flight.
    #[tracing::instrument(skip(self))]
    pub async fn update(
        &self,
        id: AppointmentId,
        cmd: UpdateAppointment,
    ) -> AppointmentResult<Appointment> {
        if id.is_nil() {
            return Err(AppointmentError::AppointmentIdRequired.into());
        }
        cmd.validate()?;
        let existing = self.get(id).await?;
        self.ensure_bookable(cmd.doctor_id, cmd.date_time, Some(id))
            .await?;

        let appointment = Appointment {
            patient_id: cmd.patient_id,
            doctor_id: cmd.doctor_id,
            date_time: cmd.date_time,
            comment: cmd.comment,
            updated_at: Utc::now(),
            ..existing
        };
        let appointment = self
            .store
            .update(appointment)
            .await
            .map_err(|e| record_conflict(e.into()))?;

        self.finish(appointment, AppointmentEvent::AppointmentUpdated { appointment_id: id })
            .await
    }

    /// Confirms a pending appointment.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, id: AppointmentId) -> AppointmentResult<Appointment> {
        let appointment = self
            .transition(id, "confirm", AppointmentStatus::Confirmed, None)
            .await?;

        self.finish(
            appointment,
            AppointmentEvent::AppointmentConfirmed { appointment_id: id },
        )
        .await
    }

    /// Cancels an appointment on the patient's behalf.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_by_patient(&self, id: AppointmentId) -> AppointmentResult<Appointment> {
        let appointment = self
            .transition(id, "cancel", AppointmentStatus::Cancelled, None)
            .await?;
        metrics::counter!("appointments_cancelled_total", "by" => "patient").increment(1);

        self.finish(
            appointment,
            AppointmentEvent::AppointmentCancelled { appointment_id: id },
        )
        .await
    }

    /// Cancels an appointment on the doctor's behalf.
    ///
    /// The justification must not be blank and is stored verbatim.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_by_doctor(
        &self,
        id: AppointmentId,
        justification: String,
    ) -> AppointmentResult<Appointment> {
        if justification.trim().is_empty() {
            return Err(AppointmentError::JustificationRequired.into());
        }

        let appointment = self
            .transition(
                id,
                "cancel",
                AppointmentStatus::Cancelled,
                Some(justification.clone()),
            )
            .await?;
        metrics::counter!("appointments_cancelled_total", "by" => "doctor").increment(1);

        self.finish(
            appointment,
            AppointmentEvent::AppointmentCancelledByDoctor {
                appointment_id: id,
                justification,
            },
        )
        .await
    }

    /// Deletes an appointment record.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: AppointmentId) -> AppointmentResult<()> {
        self.store.delete(id).await?;
        self.finish((), AppointmentEvent::AppointmentDeleted { appointment_id: id })
            .await
    }

    /// Loads an appointment by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: AppointmentId) -> Result<Appointment, DomainError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DomainError::appointment_not_found(id))
    }

    /// Lists a doctor's appointments ordered by time.
    pub async fn list_by_doctor(&self, doctor_id: DoctorId) -> Result<Vec<Appointment>, DomainError> {
        Ok(self.store.list_by_doctor(doctor_id).await?)
    }

    /// Lists a patient's appointments ordered by time.
    pub async fn list_by_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Appointment>, DomainError> {
        Ok(self.store.list_by_patient(patient_id).await?)
    }

    async fn ensure_bookable(
        &self,
        doctor_id: DoctorId,
        date_time: NaiveDateTime,
        excluding: Option<AppointmentId>,
    ) -> Result<(), DomainError> {
        if let Some(policy) = &self.policy
            && !policy.is_available(doctor_id, date_time).await?
        {
            return Err(record_conflict(
                AppointmentError::DoctorUnavailable {
                    doctor_id,
                    date_time,
                }
                .into(),
            ));
        }

        if self.store.exists_at(doctor_id, date_time, excluding).await? {
            return Err(record_conflict(
                AppointmentError::DoubleBooking {
                    doctor_id,
                    date_time,
                }
                .into(),
            ));
        }
        Ok(())
    }

    /// Moves an appointment to `target` if its current status allows it.
    ///
    /// The write is conditional on the status read here, so a racing
    /// transition is reported instead of silently overwritten.
    async fn transition(
        &self,
        id: AppointmentId,
        action: &'static str,
        target: AppointmentStatus,
        justification: Option<String>,
    ) -> Result<Appointment, DomainError> {
        let current = self.get(id).await?.status;
        let allowed = match target {
            AppointmentStatus::Confirmed => current.can_confirm(),
            AppointmentStatus::Cancelled => current.can_cancel(),
            AppointmentStatus::Pending => false,
        };
        if !allowed {
            return Err(record_conflict(
                AppointmentError::InvalidStateTransition { current, action }.into(),
            ));
        }

        let appointment = self
            .store
            .update_status(id, current, target, justification)
            .await
            .map_err(|e| record_conflict(e.into()))?;

        tracing::info!(appointment_id = %id, from = %current, to = %target, "Appointment status changed");
        Ok(appointment)
    }

    async fn finish<T>(&self, value: T, event: AppointmentEvent) -> AppointmentResult<T> {
        let result = CommandResult::new(value, event);
        self.publisher.publish(&result.events).await;
        Ok(result)
    }
}

fn record_conflict(err: DomainError) -> DomainError {
    if let DomainError::Appointment(e) = &err
        && e.is_conflict()
    {
        metrics::counter!("appointments_conflicts_total").increment(1);
        tracing::warn!(error = %e, "Rejected appointment change");
    }
    err
}
