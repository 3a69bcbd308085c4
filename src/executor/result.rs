//! Run summaries returned by operators

use super::errors::ExecutorResult;
use crate::observability::ObservationScope;

/// Counters collected over one operator `run`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Input rows read, both sides for a join
    pub rows_scanned: usize,
    /// Input rows that passed their filter
    pub rows_passed: usize,
    /// Rows appended to the output sink
    pub rows_emitted: usize,
    /// Distinct groups (aggregation)
    pub groups: usize,
    /// Grouping keys that shared a hash with an earlier, different key
    pub hash_collisions: usize,
    /// Anonymous pages allocated for spill, runs and join groups
    pub spill_pages: usize,
    /// Sorted runs materialized (join)
    pub sorted_runs: usize,
    /// Key groups buffered for expansion (join)
    pub join_groups: usize,
}

impl RunSummary {
    /// Creates an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-zero counters as log fields, in declaration order
    pub fn log_fields(&self) -> Vec<(&'static str, String)> {
        [
            ("rows_scanned", self.rows_scanned),
            ("rows_passed", self.rows_passed),
            ("rows_emitted", self.rows_emitted),
            ("groups", self.groups),
            ("hash_collisions", self.hash_collisions),
            ("spill_pages", self.spill_pages),
            ("sorted_runs", self.sorted_runs),
            ("join_groups", self.join_groups),
        ]
        .into_iter()
        .filter(|(_, v)| *v > 0)
        .map(|(k, v)| (k, v.to_string()))
        .collect()
    }
}

/// Closes an operator scope with the outcome of its run
pub(crate) fn close_scope(scope: ObservationScope<'_>, outcome: &ExecutorResult<RunSummary>) {
    match outcome {
        Ok(summary) => {
            let fields = summary.log_fields();
            let fields: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
            scope.complete_with_fields(&fields);
        }
        Err(err) => scope.fail(&err.to_string(), err.is_fatal()),
    }
}
