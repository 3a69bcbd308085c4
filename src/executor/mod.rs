//! Physical operators
//!
//! Every operator follows the same lifecycle:
//!
//! 1. `new` compiles all expressions against the input schemas and checks the
//!    output sink's arity and slot types. Nothing is read yet.
//! 2. `run` makes one pass over the input, pulling rows through a
//!    [`RecordIterator`] and appending finished rows to the sink.
//! 3. Every anonymous page the run pinned (spill, sorted runs, join groups) is
//!    released when `run` returns, on success or failure.
//!
//! # Operators
//!
//! - [`RegularSelection`] / [`RangeSelection`]: filter and project
//! - [`HashAggregate`]: grouped SUM / AVG / COUNT with a spill table
//! - [`SortMergeJoin`]: external sort of both sides, then a merge that
//!   expands each key group as a cross product

mod aggregate;
mod comparator;
mod cursor;
mod errors;
mod filters;
mod group_table;
mod join;
mod result;
mod selection;
mod sorter;

pub use aggregate::{AggKind, HashAggregate, COUNT_SEED, COUNT_SLOT, COUNT_UPDATE};
pub use comparator::JoinKeyComparator;
pub use cursor::{advance_into, PageListIterator, RangeCursor, RecordIterator};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult, Severity};
pub use filters::{Projection, RowFilter};
pub use group_table::GroupTable;
pub use join::{JoinSpec, SortMergeJoin};
pub use result::RunSummary;
pub use selection::{RangeSelection, RegularSelection};
pub use sorter::{MergedRuns, SortedRunBuilder, SortedRuns};
