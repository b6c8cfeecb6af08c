use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use common::{
    Appointment, AppointmentId, AppointmentStatus, AvailabilitySlot, DayOfWeek, DoctorId,
    PatientId, SlotId, slot_order,
};
use tokio::sync::RwLock;

use crate::{
    EventEnvelope, Result, StoreError,
    sink::EventSink,
    store::{AppointmentStore, AvailabilityStore},
};

/// In-memory availability store.
///
/// The overlap check and the write happen under one write lock, so two
/// concurrent inserts for the same doctor and day cannot both succeed.
#[derive(Clone, Default)]
pub struct InMemoryAvailabilityStore {
    slots: Arc<RwLock<HashMap<SlotId, AvailabilitySlot>>>,
}

impl InMemoryAvailabilityStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of slots stored.
    pub async fn slot_count(&self) -> usize {
        self.slots.read().await.len()
    }

    /// Removes every slot.
    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    async fn collect(&self, filter: impl Fn(&AvailabilitySlot) -> bool) -> Vec<AvailabilitySlot> {
        let slots = self.slots.read().await;
        let mut matching: Vec<_> = slots.values().filter(|s| filter(s)).cloned().collect();
        matching.sort_by_key(slot_order);
        matching
    }
}

fn ensure_no_overlap(
    slots: &HashMap<SlotId, AvailabilitySlot>,
    candidate: &AvailabilitySlot,
) -> Result<()> {
    if slots.values().any(|existing| existing.conflicts_with(candidate)) {
        return Err(StoreError::SlotOverlap {
            doctor_id: candidate.doctor_id,
            day: candidate.day_of_week,
        });
    }
    Ok(())
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn insert(&self, slot: AvailabilitySlot) -> Result<AvailabilitySlot> {
        let mut slots = self.slots.write().await;
        ensure_no_overlap(&slots, &slot)?;
        slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    async fn update(&self, slot: AvailabilitySlot) -> Result<AvailabilitySlot> {
        let mut slots = self.slots.write().await;
        if !slots.contains_key(&slot.id) {
            return Err(StoreError::NotFound {
                entity: "Slot",
                id: slot.id.as_uuid(),
            });
        }
        ensure_no_overlap(&slots, &slot)?;
        slots.insert(slot.id, slot.clone());
        Ok(slot)
    }

    async fn delete(&self, id: SlotId) -> Result<()> {
        self.slots
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                entity: "Slot",
                id: id.as_uuid(),
            })
    }

    async fn get(&self, id: SlotId) -> Result<Option<AvailabilitySlot>> {
        Ok(self.slots.read().await.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<AvailabilitySlot>> {
        let mut slots = self.collect(|_| true).await;
        slots.sort_by_key(|s| (s.doctor_id, slot_order(s)));
        Ok(slots)
    }

    async fn list_by_doctor(&self, doctor_id: DoctorId) -> Result<Vec<AvailabilitySlot>> {
        Ok(self.collect(|s| s.doctor_id == doctor_id).await)
    }

    async fn list_by_doctor_and_day(
        &self,
        doctor_id: DoctorId,
        day: DayOfWeek,
    ) -> Result<Vec<AvailabilitySlot>> {
        Ok(self
            .collect(|s| s.doctor_id == doctor_id && s.day_of_week == day)
            .await)
    }

    async fn list_by_day(&self, day: DayOfWeek) -> Result<Vec<AvailabilitySlot>> {
        Ok(self.collect(|s| s.day_of_week == day).await)
    }

    async fn delete_all_for_doctor(&self, doctor_id: DoctorId) -> Result<u64> {
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|_, s| s.doctor_id != doctor_id);
        Ok((before - slots.len()) as u64)
    }
}

/// In-memory appointment store.
///
/// The double-booking check and the write happen under one write lock.
#[derive(Clone, Default)]
pub struct InMemoryAppointmentStore {
    appointments: Arc<RwLock<HashMap<AppointmentId, Appointment>>>,
}

impl InMemoryAppointmentStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of appointments stored.
    pub async fn appointment_count(&self) -> usize {
        self.appointments.read().await.len()
    }

    /// Removes every appointment.
    pub async fn clear(&self) {
        self.appointments.write().await.clear();
    }

    async fn collect(&self, filter: impl Fn(&Appointment) -> bool) -> Vec<Appointment> {
        let appointments = self.appointments.read().await;
        let mut matching: Vec<_> = appointments
            .values()
            .filter(|a| filter(a))
            .cloned()
            .collect();
        matching.sort_by_key(|a| a.date_time);
        matching
    }
}

fn ensure_not_double_booked(
    appointments: &HashMap<AppointmentId, Appointment>,
    candidate: &Appointment,
) -> Result<()> {
    if appointments.values().any(|a| a.collides_with(candidate)) {
        return Err(StoreError::DoubleBooking {
            doctor_id: candidate.doctor_id,
            date_time: candidate.date_time,
        });
    }
    Ok(())
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment> {
        let mut appointments = self.appointments.write().await;
        ensure_not_double_booked(&appointments, &appointment)?;
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment> {
        let mut appointments = self.appointments.write().await;
        let current = appointments
            .get(&appointment.id)
            .ok_or(StoreError::NotFound {
                entity: "Appointment",
                id: appointment.id.as_uuid(),
            })?;

        // Status and justification only change through update_status
        let merged = Appointment {
            status: current.status,
            cancellation_justification: current.cancellation_justification.clone(),
            created_at: current.created_at,
            ..appointment
        };
        ensure_not_double_booked(&appointments, &merged)?;
        appointments.insert(merged.id, merged.clone());
        Ok(merged)
    }

    async fn update_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        status: AppointmentStatus,
        justification: Option<String>,
    ) -> Result<Appointment> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "Appointment",
            id: id.as_uuid(),
        })?;

        if appointment.status != expected {
            return Err(StoreError::StatusConflict {
                id: id.as_uuid(),
                expected: expected.to_string(),
                actual: appointment.status.to_string(),
            });
        }

        appointment.status = status;
        appointment.cancellation_justification = justification;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn delete(&self, id: AppointmentId) -> Result<()> {
        self.appointments
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound {
                entity: "Appointment",
                id: id.as_uuid(),
            })
    }

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn exists_at(
        &self,
        doctor_id: DoctorId,
        date_time: NaiveDateTime,
        excluding: Option<AppointmentId>,
    ) -> Result<bool> {
        Ok(self.appointments.read().await.values().any(|a| {
            a.doctor_id == doctor_id && a.date_time == date_time && Some(a.id) != excluding
        }))
    }

    async fn list_by_doctor(&self, doctor_id: DoctorId) -> Result<Vec<Appointment>> {
        Ok(self.collect(|a| a.doctor_id == doctor_id).await)
    }

    async fn list_by_patient(&self, patient_id: PatientId) -> Result<Vec<Appointment>> {
        Ok(self.collect(|a| a.patient_id == patient_id).await)
    }
}

/// Event sink that keeps every published envelope in memory.
///
/// Acts as a local outbox: tests read it back, and the server exposes nothing
/// else when no messaging collaborator is configured.
#[derive(Clone, Default)]
pub struct InMemoryEventSink {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
}

impl InMemoryEventSink {
    /// Creates a new empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every published event in publication order.
    pub async fn events(&self) -> Vec<EventEnvelope> {
        self.events.read().await.clone()
    }

    /// Returns the published events of one type.
    pub async fn events_of_type(&self, event_type: &str) -> Vec<EventEnvelope> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    /// Returns the number of published events.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Drops every recorded event.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn publish(&self, events: Vec<EventEnvelope>) -> Result<()> {
        self.events.write().await.extend(events);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn insert_and_get_slot() {
        let store = InMemoryAvailabilityStore::new();
        let slot = AvailabilitySlot::new(DoctorId::new(), DayOfWeek::Monday, t(8, 0), t(12, 0));

        store.insert(slot.clone()).await.unwrap();

        assert_eq!(store.get(slot.id).await.unwrap(), Some(slot));
        assert_eq!(store.slot_count().await, 1);
    }

    #[tokio::test]
    async fn insert_rejects_overlap_and_leaves_store_unchanged() {
        let store = InMemoryAvailabilityStore::new();
        let doctor = DoctorId::new();
        store
            .insert(AvailabilitySlot::new(doctor, DayOfWeek::Monday, t(8, 0), t(12, 0)))
            .await
            .unwrap();

        let result = store
            .insert(AvailabilitySlot::new(doctor, DayOfWeek::Monday, t(11, 0), t(13, 0)))
            .await;

        assert!(matches!(result, Err(StoreError::SlotOverlap { .. })));
        assert_eq!(store.slot_count().await, 1);
    }

    #[tokio::test]
    async fn adjacent_slots_do_not_overlap() {
        let store = InMemoryAvailabilityStore::new();
        let doctor = DoctorId::new();
        store
            .insert(AvailabilitySlot::new(doctor, DayOfWeek::Monday, t(8, 0), t(12, 0)))
            .await
            .unwrap();
        store
            .insert(AvailabilitySlot::new(doctor, DayOfWeek::Monday, t(12, 0), t(14, 0)))
            .await
            .unwrap();

        assert_eq!(store.slot_count().await, 2);
    }

    #[tokio::test]
    async fn update_excludes_the_slot_itself_from_overlap() {
        let store = InMemoryAvailabilityStore::new();
        let mut slot = AvailabilitySlot::new(DoctorId::new(), DayOfWeek::Monday, t(8, 0), t(12, 0));
        store.insert(slot.clone()).await.unwrap();

        slot.end_time = t(13, 0);
        let updated = store.update(slot.clone()).await.unwrap();

        assert_eq!(updated.end_time, t(13, 0));
    }

    #[tokio::test]
    async fn update_unknown_slot_is_not_found() {
        let store = InMemoryAvailabilityStore::new();
        let slot = AvailabilitySlot::new(DoctorId::new(), DayOfWeek::Monday, t(8, 0), t(12, 0));

        let result = store.update(slot).await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn listings_are_ordered_by_day_then_start() {
        let store = InMemoryAvailabilityStore::new();
        let doctor = DoctorId::new();
        for (day, start, end) in [
            (DayOfWeek::Wednesday, t(9, 0), t(10, 0)),
            (DayOfWeek::Monday, t(14, 0), t(15, 0)),
            (DayOfWeek::Monday, t(8, 0), t(9, 0)),
        ] {
            store
                .insert(AvailabilitySlot::new(doctor, day, start, end))
                .await
                .unwrap();
        }

        let slots = store.list_by_doctor(doctor).await.unwrap();
        let keys: Vec<_> = slots.iter().map(|s| (s.day_of_week, s.start_time)).collect();
        assert_eq!(
            keys,
            vec![
                (DayOfWeek::Monday, t(8, 0)),
                (DayOfWeek::Monday, t(14, 0)),
                (DayOfWeek::Wednesday, t(9, 0)),
            ]
        );

        let monday = store
            .list_by_doctor_and_day(doctor, DayOfWeek::Monday)
            .await
            .unwrap();
        assert_eq!(monday.len(), 2);
    }

    #[tokio::test]
    async fn delete_all_for_doctor_only_touches_that_doctor() {
        let store = InMemoryAvailabilityStore::new();
        let leaving = DoctorId::new();
        let staying = DoctorId::new();
        for day in [DayOfWeek::Monday, DayOfWeek::Tuesday] {
            store
                .insert(AvailabilitySlot::new(leaving, day, t(8, 0), t(12, 0)))
                .await
                .unwrap();
        }
        store
            .insert(AvailabilitySlot::new(staying, DayOfWeek::Monday, t(8, 0), t(12, 0)))
            .await
            .unwrap();

        let removed = store.delete_all_for_doctor(leaving).await.unwrap();

        assert_eq!(removed, 2);
        assert!(store.list_by_doctor(leaving).await.unwrap().is_empty());
        assert_eq!(store.list_by_doctor(staying).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_overlapping_inserts_admit_exactly_one() {
        let store = InMemoryAvailabilityStore::new();
        let doctor = DoctorId::new();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .insert(AvailabilitySlot::new(
                            doctor,
                            DayOfWeek::Friday,
                            t(9, 0),
                            t(11, 0),
                        ))
                        .await
                })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.slot_count().await, 1);
    }

    #[tokio::test]
    async fn appointment_insert_rejects_double_booking() {
        let store = InMemoryAppointmentStore::new();
        let doctor = DoctorId::new();
        store
            .insert(Appointment::new(PatientId::new(), doctor, at(9, 0), None))
            .await
            .unwrap();

        let result = store
            .insert(Appointment::new(PatientId::new(), doctor, at(9, 0), None))
            .await;

        assert!(matches!(result, Err(StoreError::DoubleBooking { .. })));
        assert_eq!(store.appointment_count().await, 1);
    }

    #[tokio::test]
    async fn exists_at_honours_exclusion() {
        let store = InMemoryAppointmentStore::new();
        let doctor = DoctorId::new();
        let appointment = store
            .insert(Appointment::new(PatientId::new(), doctor, at(9, 0), None))
            .await
            .unwrap();

        assert!(store.exists_at(doctor, at(9, 0), None).await.unwrap());
        assert!(
            !store
                .exists_at(doctor, at(9, 0), Some(appointment.id))
                .await
                .unwrap()
        );
        assert!(!store.exists_at(doctor, at(9, 30), None).await.unwrap());
    }

    #[tokio::test]
    async fn update_status_is_conditional_on_expected_status() {
        let store = InMemoryAppointmentStore::new();
        let appointment = store
            .insert(Appointment::new(PatientId::new(), DoctorId::new(), at(9, 0), None))
            .await
            .unwrap();

        let confirmed = store
            .update_status(
                appointment.id,
                AppointmentStatus::Pending,
                AppointmentStatus::Confirmed,
                None,
            )
            .await
            .unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        let stale = store
            .update_status(
                appointment.id,
                AppointmentStatus::Pending,
                AppointmentStatus::Cancelled,
                None,
            )
            .await;
        assert!(matches!(stale, Err(StoreError::StatusConflict { .. })));
    }

    #[tokio::test]
    async fn update_keeps_stored_status_and_justification() {
        let store = InMemoryAppointmentStore::new();
        let appointment = store
            .insert(Appointment::new(PatientId::new(), DoctorId::new(), at(9, 0), None))
            .await
            .unwrap();
        store
            .update_status(
                appointment.id,
                AppointmentStatus::Pending,
                AppointmentStatus::Cancelled,
                Some("Doctor is ill".to_string()),
            )
            .await
            .unwrap();

        // Stale copy read before the cancellation
        let moved = Appointment {
            date_time: at(10, 0),
            ..appointment
        };
        let updated = store.update(moved).await.unwrap();

        assert_eq!(updated.date_time, at(10, 0));
        assert_eq!(updated.status, AppointmentStatus::Cancelled);
        assert_eq!(
            updated.cancellation_justification.as_deref(),
            Some("Doctor is ill")
        );
        assert_eq!(store.get(appointment.id).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn appointments_listed_in_time_order() {
        let store = InMemoryAppointmentStore::new();
        let doctor = DoctorId::new();
        let patient = PatientId::new();
        store
            .insert(Appointment::new(patient, doctor, at(11, 0), None))
            .await
            .unwrap();
        store
            .insert(Appointment::new(patient, doctor, at(9, 0), None))
            .await
            .unwrap();

        let by_doctor = store.list_by_doctor(doctor).await.unwrap();
        assert_eq!(by_doctor[0].date_time, at(9, 0));
        assert_eq!(by_doctor[1].date_time, at(11, 0));
        assert_eq!(store.list_by_patient(patient).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sink_records_events_in_order() {
        let sink = InMemoryEventSink::new();
        let make = |event_type: &str| {
            EventEnvelope::new(
                event_type,
                "Appointment",
                uuid::Uuid::new_v4(),
                serde_json::json!({}),
            )
        };

        sink.publish(vec![make("AppointmentCreated"), make("AppointmentConfirmed")])
            .await
            .unwrap();

        let events = sink.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "AppointmentCreated");
        assert_eq!(sink.events_of_type("AppointmentConfirmed").await.len(), 1);

        sink.clear().await;
        assert_eq!(sink.event_count().await, 0);
    }
}
