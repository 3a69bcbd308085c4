//! Observable events
//!
//! Operator begin/complete lines come from [`ObservationScope`](super::ObservationScope);
//! the events here are the points in between that are worth a log line.

use std::fmt;

use super::logger::Severity;

/// Observable events raised by the page store and the operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Executor configuration loaded and validated
    ConfigLoaded,

    // Page store
    /// A spill pool grew by one page
    SpillPageAllocated,
    /// A table was written to disk
    TableSaved,
    /// A table was read back from disk
    TableLoaded,
    /// A page failed its checksum or a record image was malformed (FATAL)
    DataCorruption,

    // Sort
    /// One sorted run was materialized
    SortRunWritten,

    // Join
    /// A run of equal right keys was buffered for cross-product expansion
    JoinGroupBuffered,

    // Aggregation
    /// Two distinct grouping keys produced the same hash
    HashCollision,
}

impl Event {
    /// Returns the event name as it appears in the log
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SpillPageAllocated => "SPILL_PAGE_ALLOCATED",
            Event::TableSaved => "TABLE_SAVED",
            Event::TableLoaded => "TABLE_LOADED",
            Event::DataCorruption => "DATA_CORRUPTION",
            Event::SortRunWritten => "SORT_RUN_WRITTEN",
            Event::JoinGroupBuffered => "JOIN_GROUP_BUFFERED",
            Event::HashCollision => "HASH_COLLISION",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::DataCorruption)
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::DataCorruption => Severity::Fatal,
            Event::HashCollision => Severity::Warn,
            Event::SpillPageAllocated | Event::SortRunWritten | Event::JoinGroupBuffered => {
                Severity::Trace
            }
            Event::ConfigLoaded | Event::TableSaved | Event::TableLoaded => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
