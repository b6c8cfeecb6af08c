use chrono::NaiveDateTime;
use common::{DayOfWeek, DoctorId};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when interacting with a scheduling store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write would make two slots of the same doctor and day overlap.
    #[error("Slot overlaps an existing slot for doctor {doctor_id} on {day}")]
    SlotOverlap { doctor_id: DoctorId, day: DayOfWeek },

    /// A write would book a doctor twice at the same instant.
    #[error("Doctor {doctor_id} already has an appointment at {date_time}")]
    DoubleBooking {
        doctor_id: DoctorId,
        date_time: NaiveDateTime,
    },

    /// A conditional status change found a different status than expected.
    #[error("Status conflict for appointment {id}: expected {expected}, found {actual}")]
    StatusConflict {
        id: Uuid,
        expected: String,
        actual: String,
    },

    /// The record to update or delete does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be decoded into its domain type.
    #[error("Corrupt record: {0}")]
    Decode(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
