use async_trait::async_trait;
use chrono::NaiveDateTime;
use common::{
    Appointment, AppointmentId, AppointmentStatus, AvailabilitySlot, DayOfWeek, DoctorId,
    PatientId, SlotId,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventEnvelope, EventId, Result, StoreError,
    sink::EventSink,
    store::{AppointmentStore, AvailabilityStore},
};

/// Exclusion constraint rejecting overlapping slots for a doctor and day.
const SLOT_OVERLAP_CONSTRAINT: &str = "no_overlapping_slots";

/// Unique constraint rejecting two appointments for a doctor at one instant.
const DOUBLE_BOOKING_CONSTRAINT: &str = "unique_doctor_date_time";

const SLOT_COLUMNS: &str = "id, doctor_id, day_of_week, start_time, end_time";

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, date_time, status, comment, \
     cancellation_justification, created_at, updated_at";

/// Runs the database migrations for all scheduling tables.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

/// PostgreSQL-backed availability store.
///
/// The no-overlap invariant is an `EXCLUDE USING gist` constraint, so it holds
/// even when several API instances write concurrently.
#[derive(Clone)]
pub struct PostgresAvailabilityStore {
    pool: PgPool,
}

impl PostgresAvailabilityStore {
    /// Creates a new PostgreSQL availability store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_slot(row: PgRow) -> Result<AvailabilitySlot> {
        let day: i16 = row.try_get("day_of_week")?;
        let day_of_week = u8::try_from(day)
            .ok()
            .and_then(DayOfWeek::from_index)
            .ok_or_else(|| StoreError::Decode(format!("day_of_week out of range: {day}")))?;

        Ok(AvailabilitySlot {
            id: SlotId::from_uuid(row.try_get::<Uuid, _>("id")?),
            doctor_id: DoctorId::from_uuid(row.try_get::<Uuid, _>("doctor_id")?),
            day_of_week,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
        })
    }

    fn map_write_error(err: sqlx::Error, slot: &AvailabilitySlot) -> StoreError {
        if violated_constraint(&err) == Some(SLOT_OVERLAP_CONSTRAINT) {
            return StoreError::SlotOverlap {
                doctor_id: slot.doctor_id,
                day: slot.day_of_week,
            };
        }
        StoreError::Database(err)
    }

    async fn fetch(
        &self,
        sql: &str,
        binds: &[Uuid],
        day: Option<i16>,
    ) -> Result<Vec<AvailabilitySlot>> {
        let mut query = sqlx::query(sql);
        for id in binds {
            query = query.bind(*id);
        }
        if let Some(day) = day {
            query = query.bind(day);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_slot).collect()
    }
}

#[async_trait]
impl AvailabilityStore for PostgresAvailabilityStore {
    async fn insert(&self, slot: AvailabilitySlot) -> Result<AvailabilitySlot> {
        sqlx::query(
            r#"
            INSERT INTO availability_slots (id, doctor_id, day_of_week, start_time, end_time)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(slot.id.as_uuid())
        .bind(slot.doctor_id.as_uuid())
        .bind(i16::from(slot.day_of_week.index()))
        .bind(slot.start_time)
        .bind(slot.end_time)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, &slot))?;

        Ok(slot)
    }

    async fn update(&self, slot: AvailabilitySlot) -> Result<AvailabilitySlot> {
        let result = sqlx::query(
            r#"
            UPDATE availability_slots
            SET doctor_id = $2, day_of_week = $3, start_time = $4, end_time = $5
            WHERE id = $1
            "#,
        )
        .bind(slot.id.as_uuid())
        .bind(slot.doctor_id.as_uuid())
        .bind(i16::from(slot.day_of_week.index()))
        .bind(slot.start_time)
        .bind(slot.end_time)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, &slot))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Slot",
                id: slot.id.as_uuid(),
            });
        }
        Ok(slot)
    }

    async fn delete(&self, id: SlotId) -> Result<()> {
        let result = sqlx::query("DELETE FROM availability_slots WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Slot",
                id: id.as_uuid(),
            });
        }
        Ok(())
    }

    async fn get(&self, id: SlotId) -> Result<Option<AvailabilitySlot>> {
        let row = sqlx::query(&format!(
            "SELECT {SLOT_COLUMNS} FROM availability_slots WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_slot).transpose()
    }

    async fn list_all(&self) -> Result<Vec<AvailabilitySlot>> {
        self.fetch(
            &format!(
                "SELECT {SLOT_COLUMNS} FROM availability_slots \
                 ORDER BY doctor_id, day_of_week, start_time"
            ),
            &[],
            None,
        )
        .await
    }

    async fn list_by_doctor(&self, doctor_id: DoctorId) -> Result<Vec<AvailabilitySlot>> {
        self.fetch(
            &format!(
                "SELECT {SLOT_COLUMNS} FROM availability_slots WHERE doctor_id = $1 \
                 ORDER BY day_of_week, start_time"
            ),
            &[doctor_id.as_uuid()],
            None,
        )
        .await
    }

    async fn list_by_doctor_and_day(
        &self,
        doctor_id: DoctorId,
        day: DayOfWeek,
    ) -> Result<Vec<AvailabilitySlot>> {
        self.fetch(
            &format!(
                "SELECT {SLOT_COLUMNS} FROM availability_slots \
                 WHERE doctor_id = $1 AND day_of_week = $2 ORDER BY start_time"
            ),
            &[doctor_id.as_uuid()],
            Some(i16::from(day.index())),
        )
        .await
    }

    async fn list_by_day(&self, day: DayOfWeek) -> Result<Vec<AvailabilitySlot>> {
        self.fetch(
            &format!(
                "SELECT {SLOT_COLUMNS} FROM availability_slots \
                 WHERE day_of_week = $1 ORDER BY start_time, doctor_id"
            ),
            &[],
            Some(i16::from(day.index())),
        )
        .await
    }

    async fn delete_all_for_doctor(&self, doctor_id: DoctorId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM availability_slots WHERE doctor_id = $1")
            .bind(doctor_id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// PostgreSQL-backed appointment store.
///
/// Double-booking is prevented by a unique constraint on
/// `(doctor_id, date_time)`.
#[derive(Clone)]
pub struct PostgresAppointmentStore {
    pool: PgPool,
}

impl PostgresAppointmentStore {
    /// Creates a new PostgreSQL appointment store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_appointment(row: PgRow) -> Result<Appointment> {
        let status: String = row.try_get("status")?;
        let status = status
            .parse::<AppointmentStatus>()
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(Appointment {
            id: AppointmentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            patient_id: PatientId::from_uuid(row.try_get::<Uuid, _>("patient_id")?),
            doctor_id: DoctorId::from_uuid(row.try_get::<Uuid, _>("doctor_id")?),
            date_time: row.try_get("date_time")?,
            status,
            comment: row.try_get("comment")?,
            cancellation_justification: row.try_get("cancellation_justification")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn map_write_error(err: sqlx::Error, appointment: &Appointment) -> StoreError {
        if violated_constraint(&err) == Some(DOUBLE_BOOKING_CONSTRAINT) {
            return StoreError::DoubleBooking {
                doctor_id: appointment.doctor_id,
                date_time: appointment.date_time,
            };
        }
        StoreError::Database(err)
    }
}

#[async_trait]
impl AppointmentStore for PostgresAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment> {
        sqlx::query(
            r#"
            INSERT INTO appointments (id, patient_id, doctor_id, date_time, status, comment,
                                      cancellation_justification, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(appointment.id.as_uuid())
        .bind(appointment.patient_id.as_uuid())
        .bind(appointment.doctor_id.as_uuid())
        .bind(appointment.date_time)
        .bind(appointment.status.as_str())
        .bind(&appointment.comment)
        .bind(&appointment.cancellation_justification)
        .bind(appointment.created_at)
        .bind(appointment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, &appointment))?;

        Ok(appointment)
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment> {
        let row = sqlx::query(&format!(
            "UPDATE appointments \
             SET patient_id = $2, doctor_id = $3, date_time = $4, comment = $5, updated_at = $6 \
             WHERE id = $1 \
             RETURNING {APPOINTMENT_COLUMNS}"
        ))
        .bind(appointment.id.as_uuid())
        .bind(appointment.patient_id.as_uuid())
        .bind(appointment.doctor_id.as_uuid())
        .bind(appointment.date_time)
        .bind(&appointment.comment)
        .bind(appointment.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, &appointment))?;

        match row {
            Some(row) => Self::row_to_appointment(row),
            None => Err(StoreError::NotFound {
                entity: "Appointment",
                id: appointment.id.as_uuid(),
            }),
        }
    }

    async fn update_status(
        &self,
        id: AppointmentId,
        expected: AppointmentStatus,
        status: AppointmentStatus,
        justification: Option<String>,
    ) -> Result<Appointment> {
        let row = sqlx::query(&format!(
            "UPDATE appointments \
             SET status = $3, cancellation_justification = $4, updated_at = NOW() \
             WHERE id = $1 AND status = $2 \
             RETURNING {APPOINTMENT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(status.as_str())
        .bind(justification)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_appointment(row);
        }

        // Either the appointment is gone or another writer moved it first
        match self.get(id).await? {
            Some(current) => Err(StoreError::StatusConflict {
                id: id.as_uuid(),
                expected: expected.to_string(),
                actual: current.status.to_string(),
            }),
            None => Err(StoreError::NotFound {
                entity: "Appointment",
                id: id.as_uuid(),
            }),
        }
    }

    async fn delete(&self, id: AppointmentId) -> Result<()> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "Appointment",
                id: id.as_uuid(),
            });
        }
        Ok(())
    }

    async fn get(&self, id: AppointmentId) -> Result<Option<Appointment>> {
        let row = sqlx::query(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_appointment).transpose()
    }

    async fn exists_at(
        &self,
        doctor_id: DoctorId,
        date_time: NaiveDateTime,
        excluding: Option<AppointmentId>,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appointments
                WHERE doctor_id = $1 AND date_time = $2
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(doctor_id.as_uuid())
        .bind(date_time)
        .bind(excluding.map(|id| id.as_uuid()))
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn list_by_doctor(&self, doctor_id: DoctorId) -> Result<Vec<Appointment>> {
        let rows = sqlx::query(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE doctor_id = $1 ORDER BY date_time"
        ))
        .bind(doctor_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_appointment).collect()
    }

    async fn list_by_patient(&self, patient_id: PatientId) -> Result<Vec<Appointment>> {
        let rows = sqlx::query(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE patient_id = $1 ORDER BY date_time"
        ))
        .bind(patient_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_appointment).collect()
    }
}

/// Outbox table for emitted events.
///
/// Rows are written after the aggregate write has committed, in their own
/// transaction, so a crash between the two loses the event. A relay outside this workspace reads unpublished rows and forwards them
/// to the messaging collaborator.
#[derive(Clone)]
pub struct PostgresOutbox {
    pool: PgPool,
}

impl PostgresOutbox {
    /// Creates a new outbox over the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        let metadata: serde_json::Value = row.try_get("metadata")?;

        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: row.try_get("aggregate_id")?,
            aggregate_type: row.try_get("aggregate_type")?,
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
            metadata: serde_json::from_value(metadata)?,
        })
    }

    /// Returns events not yet marked as relayed, oldest first.
    pub async fn pending(&self, limit: i64) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_id, aggregate_type, timestamp, payload, metadata
            FROM outbox
            WHERE relayed_at IS NULL
            ORDER BY timestamp ASC, seq ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    /// Marks events as relayed so they are not handed out again.
    pub async fn mark_relayed(&self, event_ids: &[Uuid]) -> Result<u64> {
        let result = sqlx::query("UPDATE outbox SET relayed_at = NOW() WHERE id = ANY($1)")
            .bind(event_ids)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl EventSink for PostgresOutbox {
    async fn publish(&self, events: Vec<EventEnvelope>) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for event in &events {
            let metadata_json = serde_json::to_value(&event.metadata)?;

            sqlx::query(
                r#"
                INSERT INTO outbox (id, event_type, aggregate_id, aggregate_type, timestamp, payload, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(event.aggregate_id)
            .bind(&event.aggregate_type)
            .bind(event.timestamp)
            .bind(&event.payload)
            .bind(metadata_json)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
