//! Command results.

use crate::event::DomainEvent;

/// Result of command execution.
///
/// Commands return the events they caused as values; the service publishes
/// them once the write has committed.
#[derive(Debug, Clone)]
pub struct CommandResult<T, E: DomainEvent> {
    /// The record after the command.
    pub value: T,

    /// The events that were generated.
    pub events: Vec<E>,
}

impl<T, E: DomainEvent> CommandResult<T, E> {
    /// Creates a result carrying a single event.
    pub fn new(value: T, event: E) -> Self {
        Self {
            value,
            events: vec![event],
        }
    }

    /// Consumes the result, keeping only the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Returns the event type names, in emission order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.iter().map(DomainEvent::event_type).collect()
    }
}
