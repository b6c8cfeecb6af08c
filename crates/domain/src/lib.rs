//! Domain layer for the clinic scheduling core.
//!
//! This crate provides:
//! - [`AvailabilityManager`] for recurring weekly doctor slots and the
//!   availability queries over them
//! - [`AppointmentScheduler`] for booking appointments and driving their
//!   Pending / Confirmed / Cancelled lifecycle
//! - [`DomainEvent`] and [`CommandResult`]: every command returns the events
//!   it caused, which are then published to an event sink

pub mod appointment;
pub mod availability;
pub mod command;
pub mod error;
pub mod event;

pub use appointment::{
    AppointmentError, AppointmentEvent, AppointmentScheduler, AvailabilityPolicy,
    CreateAppointment, UpdateAppointment,
};
pub use availability::{
    AddSlot, AvailabilityError, AvailabilityEvent, AvailabilityManager, UpdateSlot,
};
pub use command::CommandResult;
pub use error::{DomainError, ErrorKind};
pub use event::{DomainEvent, EventPublisher};
