//! Shared types for the clinic scheduling core.
//!
//! Holds the identifier newtypes and the two records every layer passes
//! around: [`AvailabilitySlot`] and [`Appointment`].

mod appointment;
mod slot;
mod types;

pub use appointment::{Appointment, AppointmentStatus, ParseStatusError};
pub use slot::{AvailabilitySlot, DayOfWeek, ParseDayOfWeekError, intervals_overlap, slot_order};
pub use types::{AppointmentId, DoctorId, PatientId, SlotId};
