//! Availability commands.

use chrono::NaiveTime;
use common::{AvailabilitySlot, DayOfWeek, DoctorId};

/// Command to add a recurring weekly slot.
#[derive(Debug, Clone)]
pub struct AddSlot {
    /// The doctor offering the slot.
    pub doctor_id: DoctorId,

    /// The weekday the slot recurs on.
    pub day_of_week: DayOfWeek,

    /// Start of the slot (inclusive).
    pub start_time: NaiveTime,

    /// End of the slot (exclusive).
    pub end_time: NaiveTime,
}

impl AddSlot {
    /// Creates a new AddSlot command.
    pub fn new(
        doctor_id: DoctorId,
        day_of_week: DayOfWeek,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            doctor_id,
            day_of_week,
            start_time,
            end_time,
        }
    }

    /// Builds the slot this command would persist, with a fresh id.
    pub(crate) fn into_slot(self) -> AvailabilitySlot {
        AvailabilitySlot::new(
            self.doctor_id,
            self.day_of_week,
            self.start_time,
            self.end_time,
        )
    }
}

/// Command to change the hours of an existing slot.
///
/// The owning doctor and weekday of a slot never change, so only the times
/// are carried.
#[derive(Debug, Clone)]
pub struct UpdateSlot {
    /// New start of the slot.
    pub start_time: NaiveTime,

    /// New end of the slot.
    pub end_time: NaiveTime,
}

impl UpdateSlot {
    /// Creates a new UpdateSlot command.
    pub fn new(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time,
            end_time,
        }
    }
}
