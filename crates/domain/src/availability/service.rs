//! Availability manager.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use common::{AvailabilitySlot, DayOfWeek, DoctorId, SlotId};
use store::{AvailabilityStore, EventSink};

use crate::appointment::AvailabilityPolicy;
use crate::command::CommandResult;
use crate::error::DomainError;
use crate::event::EventPublisher;

use super::{AddSlot, AvailabilityError, AvailabilityEvent, UpdateSlot, queries};

/// Result of an availability command.
pub type SlotResult<T> = Result<CommandResult<T, AvailabilityEvent>, DomainError>;

/// Service for managing doctor availability.
///
/// Maintains each doctor's recurring weekly slots and answers availability
/// queries over them. The store enforces the no-overlap invariant atomically;
/// the manager pre-checks it to fail early with a descriptive error.
pub struct AvailabilityManager<S: AvailabilityStore> {
    store: S,
    publisher: EventPublisher,
}

impl<S: AvailabilityStore> AvailabilityManager<S> {
    /// Creates a new manager over the given store, publishing to `sink`.
    pub fn new(store: S, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            publisher: EventPublisher::new(sink),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Adds a recurring slot for a doctor.
    #[tracing::instrument(skip(self))]
    pub async fn add_slot(&self, cmd: AddSlot) -> SlotResult<AvailabilitySlot> {
        if cmd.doctor_id.is_nil() {
            return Err(AvailabilityError::DoctorIdRequired.into());
        }
        let slot = cmd.into_slot();
        ensure_valid_range(&slot)?;
        self.ensure_no_overlap(&slot).await?;

        let slot = self
            .store
            .insert(slot)
            .await
            .map_err(|e| record_conflict(e.into()))?;

        metrics::counter!("slots_created_total").increment(1);
        tracing::info!(slot_id = %slot.id, doctor_id = %slot.doctor_id, "Slot created");

        let event = AvailabilityEvent::SlotCreated {
            slot_id: slot.id,
            doctor_id: slot.doctor_id,
        };
        self.finish(slot, event).await
    }

    /// Changes the hours of an existing slot.
    ///
    /// The slot keeps its doctor and weekday.
    #[tracing::instrument(skip(self))]
    pub async fn update_slot(&self, id: SlotId, cmd: UpdateSlot) -> SlotResult<AvailabilitySlot> {
        let existing = self.get_slot(id).await?;
        let slot = AvailabilitySlot {
            start_time: cmd.start_time,
            end_time: cmd.end_time,
            ..existing
        };
        ensure_valid_range(&slot)?;
        self.ensure_no_overlap(&slot).await?;

        let slot = self
            .store
            .update(slot)
            .await
            .map_err(|e| record_conflict(e.into()))?;

        let event = AvailabilityEvent::SlotUpdated {
            slot_id: slot.id,
            doctor_id: slot.doctor_id,
        };
        self.finish(slot, event).await
    }

    /// Deletes a slot.
    #[tracing::instrument(skip(self))]
    pub async fn delete_slot(&self, id: SlotId) -> SlotResult<()> {
        self.store.delete(id).await?;
        self.finish((), AvailabilityEvent::SlotDeleted { slot_id: id })
            .await
    }

    /// Deletes every slot of a doctor in one atomic step.
    ///
    /// Returns the number of slots removed. Removing nothing still succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn delete_all_for_doctor(&self, doctor_id: DoctorId) -> SlotResult<u64> {
        if doctor_id.is_nil() {
            return Err(AvailabilityError::DoctorIdRequired.into());
        }
        let removed = self.store.delete_all_for_doctor(doctor_id).await?;
        tracing::info!(%doctor_id, removed, "Deleted all slots for doctor");

        self.finish(removed, AvailabilityEvent::SlotsDeletedForDoctor { doctor_id })
            .await
    }

    /// Loads a slot by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_slot(&self, id: SlotId) -> Result<AvailabilitySlot, DomainError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DomainError::slot_not_found(id))
    }

    /// Lists every slot.
    pub async fn list_all(&self) -> Result<Vec<AvailabilitySlot>, DomainError> {
        Ok(self.store.list_all().await?)
    }

    /// Lists a doctor's slots, ordered by day then start time.
    pub async fn list_by_doctor(
        &self,
        doctor_id: DoctorId,
    ) -> Result<Vec<AvailabilitySlot>, DomainError> {
        Ok(self.store.list_by_doctor(doctor_id).await?)
    }

    /// Lists a doctor's slots on one weekday, ordered by start time.
    pub async fn list_by_doctor_and_day(
        &self,
        doctor_id: DoctorId,
        day: DayOfWeek,
    ) -> Result<Vec<AvailabilitySlot>, DomainError> {
        Ok(self.store.list_by_doctor_and_day(doctor_id, day).await?)
    }

    /// Finds the doctors with a slot on `date`'s weekday covering the window.
    ///
    /// With either bound missing, any slot on that weekday matches.
    #[tracing::instrument(skip(self))]
    pub async fn find_available_doctors(
        &self,
        date: NaiveDate,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    ) -> Result<Vec<DoctorId>, DomainError> {
        if let (Some(start), Some(end)) = (start_time, end_time)
            && start >= end
        {
            return Err(AvailabilityError::InvalidWindow { start, end }.into());
        }

        let slots = self.store.list_by_day(DayOfWeek::of(&date)).await?;
        Ok(queries::available_doctors(&slots, start_time, end_time))
    }

    /// Returns true if one of the doctor's slots is open at `at`.
    #[tracing::instrument(skip(self))]
    pub async fn is_available(
        &self,
        doctor_id: DoctorId,
        at: NaiveDateTime,
    ) -> Result<bool, DomainError> {
        let slots = self
            .store
            .list_by_doctor_and_day(doctor_id, DayOfWeek::of(&at))
            .await?;
        Ok(slots.iter().any(|slot| slot.is_open_at(at)))
    }

    /// Sums the doctor's slot durations over the distinct weekdays in
    /// `[from, to]`.
    #[tracing::instrument(skip(self))]
    pub async fn total_available_time(
        &self,
        doctor_id: DoctorId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Duration, DomainError> {
        if from > to {
            return Err(AvailabilityError::InvalidDateRange { from, to }.into());
        }
        let slots = self.store.list_by_doctor(doctor_id).await?;
        Ok(queries::total_available_time(&slots, from, to))
    }

    /// Returns the doctor's slots with an occurrence inside `[start, end]`.
    #[tracing::instrument(skip(self))]
    pub async fn slots_in_interval(
        &self,
        doctor_id: DoctorId,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<AvailabilitySlot>, DomainError> {
        if start > end {
            return Err(AvailabilityError::InvalidInterval { start, end }.into());
        }
        let slots = self.store.list_by_doctor(doctor_id).await?;
        Ok(queries::slots_in_interval(&slots, start, end))
    }

    async fn ensure_no_overlap(&self, slot: &AvailabilitySlot) -> Result<(), DomainError> {
        let siblings = self
            .store
            .list_by_doctor_and_day(slot.doctor_id, slot.day_of_week)
            .await?;

        if siblings.iter().any(|other| slot.conflicts_with(other)) {
            return Err(record_conflict(
                AvailabilityError::Overlap {
                    doctor_id: slot.doctor_id,
                    day: slot.day_of_week,
                }
                .into(),
            ));
        }
        Ok(())
    }

    async fn finish<T>(&self, value: T, event: AvailabilityEvent) -> SlotResult<T> {
        let result = CommandResult::new(value, event);
        self.publisher.publish(&result.events).await;
        Ok(result)
    }
}

#[async_trait]
impl<S: AvailabilityStore> AvailabilityPolicy for AvailabilityManager<S> {
    async fn is_available(
        &self,
        doctor_id: DoctorId,
        at: NaiveDateTime,
    ) -> Result<bool, DomainError> {
        AvailabilityManager::is_available(self, doctor_id, at).await
    }
}

fn ensure_valid_range(slot: &AvailabilitySlot) -> Result<(), DomainError> {
    if slot.has_valid_range() {
        Ok(())
    } else {
        Err(AvailabilityError::InvalidTimeRange {
            start: slot.start_time,
            end: slot.end_time,
        }
        .into())
    }
}

fn record_conflict(err: DomainError) -> DomainError {
    if let DomainError::Availability(AvailabilityError::Overlap { doctor_id, day }) = &err {
        metrics::counter!("slots_conflicts_total").increment(1);
        tracing::warn!(%doctor_id, %day, "Rejected overlapping slot");
    }
    err
}
