//! Selection operators
//!
//! Both operators compile the filter and projections once, then make a single
//! pass: every row the filter accepts is projected into the output sink.
//! `RegularSelection` scans the table in storage order, `RangeSelection`
//! drives an index range cursor over a closed interval.

use std::sync::Arc;

use super::cursor::{advance_into, PageListIterator, RangeCursor, RecordIterator};
use super::errors::ExecutorResult;
use super::filters::{Projection, RowFilter};
use super::result::{close_scope, RunSummary};
use crate::index::{IndexKey, IndexedTable};
use crate::observability::ObservationScope;
use crate::record::{AttValue, Record, Schema};
use crate::storage::{RecordSink, Table};

/// Filter and project every row of a table
pub struct RegularSelection<'a, O: RecordSink + ?Sized> {
    input: &'a Table,
    output: &'a mut O,
    filter: RowFilter,
    projection: Projection,
}

impl<'a, O: RecordSink + ?Sized> RegularSelection<'a, O> {
    pub fn new(
        input: &'a Table,
        output: &'a mut O,
        filter: &str,
        projections: &[&str],
    ) -> ExecutorResult<Self> {
        let schema: &Schema = input.schema();
        let filter = RowFilter::compile(filter, &[schema])?;
        let projection = Projection::compile(projections, &[schema], output.schema())?;
        Ok(Self {
            input,
            output,
            filter,
            projection,
        })
    }

    /// Runs the selection. Output follows input order.
    pub fn run(&mut self) -> ExecutorResult<RunSummary> {
        let scope = ObservationScope::with_fields("REGULAR_SELECTION", &[("input", self.input.name())]);
        let mut scan = PageListIterator::scan(self.input);
        let outcome = drain(
            &mut scan,
            self.input.schema(),
            &self.filter,
            &mut self.projection,
            &mut *self.output,
        );
        close_scope(scope, &outcome);
        outcome
    }
}

/// Filter and project the rows of an index range
pub struct RangeSelection<'a, O: RecordSink + ?Sized> {
    input: &'a IndexedTable,
    output: &'a mut O,
    low: IndexKey,
    high: IndexKey,
    bounds: String,
    filter: RowFilter,
    projection: Projection,
}

impl<'a, O: RecordSink + ?Sized> RangeSelection<'a, O> {
    /// Coerces the closed range [low, high] to index keys up front, so a
    /// bound of the wrong type fails here rather than in `run`. Rows are
    /// pulled from the index only while running.
    pub fn new(
        input: &'a IndexedTable,
        output: &'a mut O,
        low: &AttValue,
        high: &AttValue,
        filter: &str,
        projections: &[&str],
    ) -> ExecutorResult<Self> {
        let schema: &Schema = input.schema();
        let bounds = format!("[{}, {}]", low, high);
        let (low, high) = input.range_keys(low, high)?;
        let filter = RowFilter::compile(filter, &[schema])?;
        let projection = Projection::compile(projections, &[schema], output.schema())?;
        Ok(Self {
            input,
            output,
            low,
            high,
            bounds,
            filter,
            projection,
        })
    }

    /// Runs the selection. Output follows key order, ties in table order.
    pub fn run(&mut self) -> ExecutorResult<RunSummary> {
        let scope = ObservationScope::with_fields(
            "RANGE_SELECTION",
            &[
                ("input", self.input.table().name()),
                ("bounds", &self.bounds),
            ],
        );
        let rows = self.input.tree().range_iter(&self.low, &self.high);
        let mut cursor = RangeCursor::new(self.input.table(), rows);
        let outcome = drain(
            &mut cursor,
            self.input.schema(),
            &self.filter,
            &mut self.projection,
            &mut *self.output,
        );
        close_scope(scope, &outcome);
        outcome
    }
}

fn drain<I, O>(
    iter: &mut I,
    schema: &Arc<Schema>,
    filter: &RowFilter,
    projection: &mut Projection,
    output: &mut O,
) -> ExecutorResult<RunSummary>
where
    I: RecordIterator + ?Sized,
    O: RecordSink + ?Sized,
{
    let mut record = Record::new(Arc::clone(schema));
    let mut summary = RunSummary::new();
    while advance_into(iter, &mut record)? {
        summary.rows_scanned += 1;
        if !filter.matches(&[&record])? {
            continue;
        }
        summary.rows_passed += 1;
        output.append(projection.project(&[&record])?)?;
        summary.rows_emitted += 1;
    }
    Ok(summary)
}
