//! Sort-merge equi-join
//!
//! Phase 1 sorts each side by its join key into sorted runs, applying that
//! side's filter while the runs are written. Phase 2 merges the two sorted
//! cursors:
//!
//! - keys differ: advance the side with the smaller key
//! - keys equal: copy every left record with that key into a join group pool,
//!   then for each right record with the same key rescan the group, test the
//!   predicate over (left, right) and project the pairs that pass
//!
//! The join ends as soon as either side is exhausted, after the current group
//! has been expanded.

use std::cmp::Ordering;
use std::sync::Arc;

use super::comparator::JoinKeyComparator;
use super::cursor::{advance_into, PageListIterator};
use super::errors::{ExecutorError, ExecutorResult};
use super::filters::{Projection, RowFilter};
use super::result::{close_scope, RunSummary};
use super::sorter::{MergedRuns, SortedRunBuilder};
use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::record::{AttValue, Record, Schema};
use crate::storage::{BufferManager, PagePool, RecordSink, Table};

const ALWAYS: &str = "bool[true]";

/// Expressions describing one join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    left_key: String,
    right_key: String,
    left_filter: String,
    right_filter: String,
    predicate: String,
    projections: Vec<String>,
}

impl JoinSpec {
    /// Equi-join on `left_key = right_key` with no filters and no projections
    pub fn on(left_key: &str, right_key: &str) -> Self {
        Self {
            left_key: left_key.to_string(),
            right_key: right_key.to_string(),
            left_filter: ALWAYS.to_string(),
            right_filter: ALWAYS.to_string(),
            predicate: ALWAYS.to_string(),
            projections: Vec::new(),
        }
    }

    /// Per-side row filters, applied before sorting
    pub fn with_filters(mut self, left: &str, right: &str) -> Self {
        self.left_filter = left.to_string();
        self.right_filter = right.to_string();
        self
    }

    /// Predicate over (left, right) applied to every key match
    pub fn with_predicate(mut self, predicate: &str) -> Self {
        self.predicate = predicate.to_string();
        self
    }

    /// Output expressions over (left, right), one per output attribute
    pub fn project(mut self, exprs: &[&str]) -> Self {
        self.projections = exprs.iter().map(|e| e.to_string()).collect();
        self
    }
}

/// Sort-merge equi-join of two tables into a sink
pub struct SortMergeJoin<'a, O: RecordSink + ?Sized> {
    buffer: BufferManager,
    run_pages: usize,
    left: &'a Table,
    right: &'a Table,
    output: &'a mut O,
    keys: JoinKeyComparator,
    left_filter: RowFilter,
    right_filter: RowFilter,
    predicate: RowFilter,
    projection: Projection,
}

impl<'a, O: RecordSink + ?Sized> SortMergeJoin<'a, O> {
    /// Compiles keys, filters, predicate and projections.
    ///
    /// The predicate and projections resolve names against the left schema
    /// first, then the right.
    pub fn new(
        buffer: &BufferManager,
        left: &'a Table,
        right: &'a Table,
        output: &'a mut O,
        spec: &JoinSpec,
    ) -> ExecutorResult<Self> {
        let left_schema: &Schema = left.schema();
        let right_schema: &Schema = right.schema();
        let both = [left_schema, right_schema];

        let keys =
            JoinKeyComparator::new(&spec.left_key, &spec.right_key, left_schema, right_schema)?;
        let left_filter = RowFilter::compile(&spec.left_filter, &[left_schema])?;
        let right_filter = RowFilter::compile(&spec.right_filter, &[right_schema])?;
        let predicate = RowFilter::compile(&spec.predicate, &both)?;
        let exprs: Vec<&str> = spec.projections.iter().map(String::as_str).collect();
        let projection = Projection::compile(&exprs, &both, output.schema())?;

        Ok(Self {
            buffer: buffer.clone(),
            run_pages: buffer.run_pages(),
            left,
            right,
            output,
            keys,
            left_filter,
            right_filter,
            predicate,
            projection,
        })
    }

    /// Overrides the number of input pages sorted per run
    pub fn with_run_pages(mut self, run_pages: usize) -> Self {
        self.run_pages = run_pages.max(1);
        self
    }

    /// Runs the join.
    ///
    /// Output is grouped by key in ascending order; within a key, each right
    /// record is paired with the left group in left sorted order.
    pub fn run(&mut self) -> ExecutorResult<RunSummary> {
        let scope = ObservationScope::with_fields(
            "SORT_MERGE_JOIN",
            &[("left", self.left.name()), ("right", self.right.name())],
        );
        let outcome = self.join();
        close_scope(scope, &outcome);
        outcome
    }

    fn join(&mut self) -> ExecutorResult<RunSummary> {
        let allocated_before = self.buffer.allocated();
        let builder = SortedRunBuilder::new(&self.buffer).with_run_pages(self.run_pages);
        let left_runs = builder.build(self.left, self.keys.left(), &self.left_filter)?;
        let right_runs = builder.build(self.right, self.keys.right(), &self.right_filter)?;

        let mut summary = RunSummary {
            rows_scanned: left_runs.scanned() + right_runs.scanned(),
            rows_passed: left_runs.passed() + right_runs.passed(),
            sorted_runs: left_runs.run_count() + right_runs.run_count(),
            ..RunSummary::default()
        };

        let mut l_cur = left_runs.merged(self.keys.left());
        let mut r_cur = right_runs.merged(self.keys.right());
        let mut l_rec = Record::new(Arc::clone(self.left.schema()));
        let mut r_rec = Record::new(Arc::clone(self.right.schema()));
        let mut buffered = Record::new(Arc::clone(self.left.schema()));
        let mut group = PagePool::new(&self.buffer, "join_group");

        let mut l_live = advance_into(&mut l_cur, &mut l_rec)?;
        let mut r_live = advance_into(&mut r_cur, &mut r_rec)?;
        while l_live && r_live {
            let l_key = current_key(&l_cur)?;
            match self.keys.compare(l_key, current_key(&r_cur)?) {
                Ordering::Less => l_live = advance_into(&mut l_cur, &mut l_rec)?,
                Ordering::Greater => r_live = advance_into(&mut r_cur, &mut r_rec)?,
                Ordering::Equal => {
                    let witness = l_key.clone();

                    group.clear();
                    loop {
                        group.append_record(&l_rec)?;
                        l_live = advance_into(&mut l_cur, &mut l_rec)?;
                        if !l_live || !self.keys.keys_equal(current_key(&l_cur)?, &witness) {
                            break;
                        }
                    }
                    summary.join_groups += 1;
                    log_group(&witness, &group);

                    while r_live && self.keys.keys_equal(&witness, current_key(&r_cur)?) {
                        let mut scan = PageListIterator::new(group.pages());
                        while advance_into(&mut scan, &mut buffered)? {
                            if !self.predicate.matches(&[&buffered, &r_rec])? {
                                continue;
                            }
                            self.output
                                .append(self.projection.project(&[&buffered, &r_rec])?)?;
                            summary.rows_emitted += 1;
                        }
                        r_live = advance_into(&mut r_cur, &mut r_rec)?;
                    }
                }
            }
        }

        summary.spill_pages = self.buffer.allocated() - allocated_before;
        Ok(summary)
    }
}

fn current_key<'c>(cursor: &'c MergedRuns<'_>) -> ExecutorResult<&'c AttValue> {
    cursor
        .current_key()
        .ok_or_else(|| ExecutorError::execution_failed("merge cursor has no current record"))
}

fn log_group(witness: &AttValue, group: &PagePool) {
    let key = witness.to_string();
    let records = group.record_count().to_string();
    let pages = group.page_count().to_string();
    log_event_with_fields(
        Event::JoinGroupBuffered,
        &[("key", &key), ("records", &records), ("pages", &pages)],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecConfig;
    use crate::executor::errors::ExecutorErrorCode;
    use crate::record::AttType;

    fn side(name: &str, att: &str, rows: &[(i64, &str)]) -> Table {
        let schema = Arc::new(Schema::from_pairs([
            ("k", AttType::Int),
            (att, AttType::String),
        ]));
        let mut t = Table::new(name, schema.clone(), 128);
        for (k, s) in rows {
            t.append_record(
                &Record::from_values(
                    schema.clone(),
                    vec![AttValue::Int(*k), AttValue::String(s.to_string())],
                )
                .unwrap(),
            )
            .unwrap();
        }
        t
    }

    fn pairs_out() -> Table {
        Table::new(
            "out",
            Arc::new(Schema::from_pairs([("a", AttType::String), ("b", AttType::String)])),
            128,
        )
    }

    fn sorted_pairs(t: &Table) -> Vec<(String, String)> {
        let mut rows: Vec<(String, String)> = t
            .rows()
            .unwrap()
            .iter()
            .map(|r| (r.att(0).unwrap().to_string(), r.att(1).unwrap().to_string()))
            .collect();
        rows.sort();
        rows
    }

    fn buffer() -> BufferManager {
        BufferManager::new(&ExecConfig::with_pages(128, 8))
    }

    #[test]
    fn test_cross_product_within_key() {
        let left = side("l", "a", &[(1, "x"), (1, "y")]);
        let right = side("r", "b", &[(1, "p"), (1, "q")]);
        let mut out = pairs_out();
        let spec = JoinSpec::on("[k]", "[k]").project(&["[a]", "[b]"]);
        let summary = SortMergeJoin::new(&buffer(), &left, &right, &mut out, &spec)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(summary.rows_emitted, 4);
        assert_eq!(summary.join_groups, 1);
        let expected: Vec<(String, String)> = [("x", "p"), ("x", "q"), ("y", "p"), ("y", "q")]
            .iter()
            .map(|(a, b)| (format!("string[{}]", a), format!("string[{}]", b)))
            .collect();
        assert_eq!(sorted_pairs(&out), expected);
    }

    #[test]
    fn test_unmatched_keys_skipped() {
        let left = side("l", "a", &[(3, "c"), (1, "a"), (5, "e")]);
        let right = side("r", "b", &[(4, "d"), (5, "E"), (1, "A"), (2, "B")]);
        let mut out = pairs_out();
        let spec = JoinSpec::on("[k]", "[k]").project(&["[a]", "[b]"]);
        SortMergeJoin::new(&buffer(), &left, &right, &mut out, &spec)
            .unwrap()
            .run()
            .unwrap();
        let rows: Vec<String> = out
            .rows()
            .unwrap()
            .iter()
            .map(|r| r.att(0).unwrap().to_string())
            .collect();
        // Output follows key order
        assert_eq!(rows, vec!["string[a]", "string[e]"]);
    }

    #[test]
    fn test_filters_and_predicate() {
        let left = side("l", "a", &[(1, "x"), (1, "y"), (2, "z")]);
        let right = side("r", "b", &[(1, "p"), (1, "q"), (2, "r")]);
        let mut out = pairs_out();
        let spec = JoinSpec::on("[k]", "[k]")
            .with_filters("!= ([a], string[y])", "bool[true]")
            .with_predicate("!= ([b], string[q])")
            .project(&["[a]", "[b]"]);
        SortMergeJoin::new(&buffer(), &left, &right, &mut out, &spec)
            .unwrap()
            .run()
            .unwrap();
        let expected: Vec<(String, String)> = [("x", "p"), ("z", "r")]
            .iter()
            .map(|(a, b)| (format!("string[{}]", a), format!("string[{}]", b)))
            .collect();
        assert_eq!(sorted_pairs(&out), expected);
    }

    #[test]
    fn test_pages_released_after_run() {
        let buffer = buffer();
        let left = side("l", "a", &[(1, "x"), (2, "y")]);
        let right = side("r", "b", &[(2, "p"), (1, "q")]);
        let mut out = pairs_out();
        let spec = JoinSpec::on("[k]", "[k]").project(&["[a]", "[b]"]);
        let summary = SortMergeJoin::new(&buffer, &left, &right, &mut out, &spec)
            .unwrap()
            .run()
            .unwrap();
        assert!(summary.spill_pages > 0);
        assert_eq!(buffer.pinned(), 0);
    }

    #[test]
    fn test_key_type_mismatch() {
        let left = side("l", "a", &[]);
        let right = side("r", "b", &[]);
        let mut out = pairs_out();
        let spec = JoinSpec::on("[k]", "[b]").project(&["[a]", "[b]"]);
        let err = SortMergeJoin::new(&buffer(), &left, &right, &mut out, &spec)
            .err()
            .unwrap();
        assert_eq!(err.code(), ExecutorErrorCode::RelJoinKeyMismatch);
    }

    #[test]
    fn test_empty_side_emits_nothing() {
        let left = side("l", "a", &[(1, "x")]);
        let right = side("r", "b", &[]);
        let mut out = pairs_out();
        let spec = JoinSpec::on("[k]", "[k]").project(&["[a]", "[b]"]);
        let summary = SortMergeJoin::new(&buffer(), &left, &right, &mut out, &spec)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(summary.rows_emitted, 0);
        assert!(out.is_empty());
    }
}
