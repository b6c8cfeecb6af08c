//! Persistence and event hand-off for the clinic scheduling core.
//!
//! - [`AvailabilityStore`] and [`AppointmentStore`] persist the two aggregates
//!   and enforce their uniqueness invariants atomically with each write
//! - [`EventSink`] receives the domain events the services emit
//! - In-memory implementations for tests and single-node runs, PostgreSQL
//!   implementations for production

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod sink;
pub mod store;

pub use error::{Result, StoreError};
pub use event::{EventEnvelope, EventId};
pub use memory::{InMemoryAppointmentStore, InMemoryAvailabilityStore, InMemoryEventSink};
pub use postgres::{
    PostgresAppointmentStore, PostgresAvailabilityStore, PostgresOutbox, run_migrations,
};
pub use sink::{EventSink, TracingEventSink};
pub use store::{AppointmentStore, AvailabilityStore};
