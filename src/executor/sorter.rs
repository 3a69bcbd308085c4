//! External sort into sorted runs
//!
//! The input table is cut into chunks of `run_pages` pages. Each chunk is
//! filtered, sorted in memory by the key expression and written to its own
//! page pool. `MergedRuns` then merges the runs through a min-heap into one
//! cursor.
//!
//! The sort is stable: runs are cut in table order, each run is stably
//! sorted, and the merge breaks key ties by run index.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::sync::Arc;

use super::cursor::{advance_into, PageListIterator, RecordIterator};
use super::errors::{ExecutorError, ExecutorResult};
use super::filters::RowFilter;
use crate::expr::Evaluator;
use crate::observability::{log_event_with_fields, Event};
use crate::record::{AttValue, Record, Schema};
use crate::storage::{BufferManager, PagePool, PinnedPage, Table};

/// Builds sorted runs from a table
#[derive(Debug, Clone)]
pub struct SortedRunBuilder {
    buffer: BufferManager,
    run_pages: usize,
}

impl SortedRunBuilder {
    /// Run size defaults to the buffer manager's configured run pages
    pub fn new(buffer: &BufferManager) -> Self {
        Self {
            buffer: buffer.clone(),
            run_pages: buffer.run_pages().max(1),
        }
    }

    /// Overrides the number of input pages sorted per run
    pub fn with_run_pages(mut self, run_pages: usize) -> Self {
        self.run_pages = run_pages.max(1);
        self
    }

    pub fn run_pages(&self) -> usize {
        self.run_pages
    }

    /// Sorts the rows of `table` passing `filter` by `key`
    pub fn build(
        &self,
        table: &Table,
        key: &Evaluator,
        filter: &RowFilter,
    ) -> ExecutorResult<SortedRuns> {
        let schema = Arc::clone(table.schema());
        let mut runs = Vec::new();
        let mut scanned = 0;
        let mut passed = 0;
        let mut record = Record::new(Arc::clone(&schema));
        let mut chunk: Vec<(AttValue, Record)> = Vec::new();

        for pages in table.pages().chunks(self.run_pages) {
            chunk.clear();
            let mut scan = PageListIterator::new(pages);
            while advance_into(&mut scan, &mut record)? {
                scanned += 1;
                if !filter.matches(&[&record])? {
                    continue;
                }
                chunk.push((key.eval(&[&record])?, record.clone()));
            }
            if chunk.is_empty() {
                continue;
            }
            passed += chunk.len();

            // sort_by is stable, so equal keys keep table order
            chunk.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut pool = PagePool::new(&self.buffer, "sort_run");
            for (_, rec) in &chunk {
                pool.append_record(rec)?;
            }

            let run = runs.len().to_string();
            let records = chunk.len().to_string();
            let pages = pool.page_count().to_string();
            log_event_with_fields(
                Event::SortRunWritten,
                &[
                    ("table", table.name()),
                    ("run", &run),
                    ("records", &records),
                    ("pages", &pages),
                ],
            );
            runs.push(pool);
        }

        Ok(SortedRuns {
            schema,
            runs,
            scanned,
            passed,
        })
    }
}

/// Sorted runs of one table, each in its own pool
#[derive(Debug)]
pub struct SortedRuns {
    schema: Arc<Schema>,
    runs: Vec<PagePool>,
    scanned: usize,
    passed: usize,
}

impl SortedRuns {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Pages held across all runs
    pub fn page_count(&self) -> usize {
        self.runs.iter().map(PagePool::page_count).sum()
    }

    /// Rows read from the table
    pub fn scanned(&self) -> usize {
        self.scanned
    }

    /// Rows that passed the filter and were written to a run
    pub fn passed(&self) -> usize {
        self.passed
    }

    /// Cursor over all runs in key order.
    ///
    /// `key` must be the evaluator the runs were sorted with.
    pub fn merged(&self, key: &Evaluator) -> MergedRuns<'_> {
        let cursors: Vec<_> = self
            .runs
            .iter()
            .map(|pool| PageListIterator::new(pool.pages()))
            .collect();
        let heads = cursors
            .iter()
            .map(|_| Record::new(Arc::clone(&self.schema)))
            .collect();
        MergedRuns {
            key: key.clone(),
            heap: BinaryHeap::with_capacity(cursors.len()),
            cursors,
            heads,
            current: None,
            primed: false,
        }
    }
}

/// Next record of one run, ordered by key then run index
#[derive(Debug)]
struct HeapEntry {
    key: AttValue,
    run: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then(self.run.cmp(&other.run))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// K-way merge of sorted runs
pub struct MergedRuns<'a> {
    key: Evaluator,
    cursors: Vec<PageListIterator<'a, PinnedPage>>,
    heads: Vec<Record>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
    current: Option<(usize, AttValue)>,
    primed: bool,
}

impl MergedRuns<'_> {
    /// Key of the current record
    pub fn current_key(&self) -> Option<&AttValue> {
        self.current.as_ref().map(|(_, key)| key)
    }

    fn pull(&mut self, run: usize) -> ExecutorResult<()> {
        if advance_into(&mut self.cursors[run], &mut self.heads[run])? {
            let key = self.key.eval(&[&self.heads[run]])?;
            self.heap.push(Reverse(HeapEntry { key, run }));
        }
        Ok(())
    }
}

impl RecordIterator for MergedRuns<'_> {
    fn advance(&mut self) -> ExecutorResult<bool> {
        if !self.primed {
            self.primed = true;
            for run in 0..self.cursors.len() {
                self.pull(run)?;
            }
        } else if let Some((run, _)) = self.current.take() {
            self.pull(run)?;
        }

        match self.heap.pop() {
            Some(Reverse(entry)) => {
                self.current = Some((entry.run, entry.key));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn current_into(&self, out: &mut Record) -> ExecutorResult<()> {
        let (run, _) = self.current.as_ref().ok_or_else(|| {
            ExecutorError::execution_failed("merged cursor read before advance or after exhaustion")
        })?;
        out.clone_from(&self.heads[*run]);
        Ok(())
    }
}
