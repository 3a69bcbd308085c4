//! Record iteration protocol
//!
//! Every input an operator reads (table scans, index range scans, sorted-run
//! merges, buffered join groups) is a pull cursor: `advance` moves to the next
//! record, `current_into` decodes it into a caller-owned record that is reused
//! for the whole pass.

use crate::record::Record;
use crate::storage::{Page, RowId, StorageError, Table};

use super::errors::{ExecutorError, ExecutorResult};

/// Pull cursor over records
pub trait RecordIterator {
    /// Moves to the next record. Returns false once exhausted.
    fn advance(&mut self) -> ExecutorResult<bool>;

    /// Decodes the current record into `out`
    fn current_into(&self, out: &mut Record) -> ExecutorResult<()>;
}

/// Advances `iter` and, if it produced a record, decodes it into `out`
pub fn advance_into<I: RecordIterator + ?Sized>(
    iter: &mut I,
    out: &mut Record,
) -> ExecutorResult<bool> {
    if iter.advance()? {
        iter.current_into(out)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

fn not_positioned() -> ExecutorError {
    ExecutorError::execution_failed("cursor read before advance or after exhaustion")
}

fn decode(image: &[u8], out: &mut Record) -> ExecutorResult<()> {
    // A stored image that fails to decode is corrupt
    out.from_binary(image).map_err(StorageError::from)?;
    Ok(())
}

/// Cursor over every record of a list of pages, in page then append order
pub struct PageListIterator<'a, P: AsRef<Page>> {
    pages: &'a [P],
    page: usize,
    slot: usize,
    current: Option<&'a [u8]>,
}

impl<'a, P: AsRef<Page>> PageListIterator<'a, P> {
    pub fn new(pages: &'a [P]) -> Self {
        Self {
            pages,
            page: 0,
            slot: 0,
            current: None,
        }
    }
}

impl<'a> PageListIterator<'a, Page> {
    /// Full scan of a table
    pub fn scan(table: &'a Table) -> Self {
        Self::new(table.pages())
    }
}

impl<P: AsRef<Page>> RecordIterator for PageListIterator<'_, P> {
    fn advance(&mut self) -> ExecutorResult<bool> {
        while let Some(page) = self.pages.get(self.page) {
            let page = page.as_ref();
            if let Some(&offset) = page.offsets().get(self.slot) {
                self.current = Some(page.image_at(offset)?);
                self.slot += 1;
                return Ok(true);
            }
            self.page += 1;
            self.slot = 0;
        }
        self.current = None;
        Ok(false)
    }

    fn current_into(&self, out: &mut Record) -> ExecutorResult<()> {
        decode(self.current.ok_or_else(not_positioned)?, out)
    }
}

/// Cursor over a stream of row ids, pulled one per `advance`.
///
/// Index range scans feed it straight from the tree.
pub struct RangeCursor<'a, R> {
    table: &'a Table,
    rows: R,
    current: Option<RowId>,
}

impl<'a, R: Iterator<Item = RowId>> RangeCursor<'a, R> {
    pub fn new(table: &'a Table, rows: R) -> Self {
        Self {
            table,
            rows,
            current: None,
        }
    }
}

impl<R: Iterator<Item = RowId>> RecordIterator for RangeCursor<'_, R> {
    fn advance(&mut self) -> ExecutorResult<bool> {
        self.current = self.rows.next();
        Ok(self.current.is_some())
    }

    fn current_into(&self, out: &mut Record) -> ExecutorResult<()> {
        let row = self.current.ok_or_else(not_positioned)?;
        self.table.read_into(row, out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AttType, AttValue, Schema};
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::from_pairs([("k", AttType::Int)]))
    }

    fn table(n: i64) -> Table {
        let mut t = Table::new("t", schema(), 64);
        for i in 0..n {
            t.append_record(&Record::from_values(schema(), vec![AttValue::Int(i)]).unwrap())
                .unwrap();
        }
        t
    }

    fn collect<I: RecordIterator>(mut iter: I) -> Vec<i64> {
        let mut rec = Record::new(schema());
        let mut out = Vec::new();
        while advance_into(&mut iter, &mut rec).unwrap() {
            match rec.att(0).unwrap() {
                AttValue::Int(i) => out.push(*i),
                other => panic!("unexpected {}", other),
            }
        }
        out
    }

    #[test]
    fn test_scan_crosses_pages_in_order() {
        // 12 bytes per row with prefix, 5 per page
        let t = table(12);
        assert_eq!(t.page_count(), 3);
        assert_eq!(collect(PageListIterator::scan(&t)), (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_scan_empty_table() {
        let t = table(0);
        let mut iter = PageListIterator::scan(&t);
        assert!(!iter.advance().unwrap());
        assert!(!iter.advance().unwrap());
    }

    #[test]
    fn test_read_before_advance_fails() {
        let t = table(1);
        let iter = PageListIterator::scan(&t);
        let mut rec = Record::new(schema());
        assert!(iter.current_into(&mut rec).is_err());
    }

    #[test]
    fn test_range_cursor_follows_row_list() {
        let t = table(6);
        let mut all = Vec::new();
        for (page_no, page) in t.pages().iter().enumerate() {
            for &offset in page.offsets() {
                all.push(RowId {
                    page: page_no,
                    offset,
                });
            }
        }
        let picked = vec![all[4], all[1], all[5]];
        let cursor = RangeCursor::new(&t, picked.into_iter());
        assert_eq!(collect(cursor), vec![4, 1, 5]);
    }
}
