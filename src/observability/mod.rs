//! Observability for the page store and operators
//!
//! - Structured logging (JSON lines, deterministic key order)
//! - Operator begin/complete scopes
//! - Typed events for spills, sorted runs, join groups and collisions
//!
//! Observability is read-only: nothing here changes what an operator produces.
//!
//! # Usage
//!
//! ```ignore
//! use relops::observability::{log_event_with_fields, Event, ObservationScope};
//!
//! let scope = ObservationScope::with_fields("SORT_MERGE_JOIN", &[("left", "emp")]);
//! log_event_with_fields(Event::SortRunWritten, &[("records", "120")]);
//! scope.complete_with_fields(&[("emitted", "42")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
