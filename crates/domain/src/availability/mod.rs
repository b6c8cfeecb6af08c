//! Doctor availability: recurring weekly slots and the queries over them.

mod commands;
mod events;
pub mod queries;
mod service;

pub use commands::{AddSlot, UpdateSlot};
pub use events::AvailabilityEvent;
pub use service::AvailabilityManager;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use common::{DayOfWeek, DoctorId};
use thiserror::Error;

/// Errors that can occur during availability operations.
#[derive(Debug, Error)]
pub enum AvailabilityError {
    /// Doctor ID is required.
    #[error("Doctor ID is required")]
    DoctorIdRequired,

    /// Slot start is not before its end.
    #[error("Invalid time range: start {start} must be before end {end}")]
    InvalidTimeRange { start: NaiveTime, end: NaiveTime },

    /// Requested window start is not before its end.
    #[error("Invalid window: start {start} must be before end {end}")]
    InvalidWindow { start: NaiveTime, end: NaiveTime },

    /// Date range is reversed.
    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    /// Interval is reversed.
    #[error("Invalid interval: {start} is after {end}")]
    InvalidInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// The slot would overlap another slot of the same doctor and day.
    #[error("Slot overlaps an existing slot for doctor {doctor_id} on {day}")]
    Overlap { doctor_id: DoctorId, day: DayOfWeek },
}

impl AvailabilityError {
    /// Returns true for errors caused by existing state rather than bad input.
    pub fn is_conflict(&self) -> bool {
        matches!(self, AvailabilityError::Overlap { .. })
    }
}
