//! Operator-owned pools of pinned pages
//!
//! A `PagePool` is the append-only scratch space of one operator call. Appends go
//! to the last page and roll to a freshly pinned page when it is full; the returned
//! `PageLocation` stays valid until the pool is cleared or dropped.

use uuid::Uuid;

use super::buffer::{BufferManager, PinnedPage};
use super::errors::{StorageError, StorageResult};
use super::page::Page;
use crate::observability::{log_event_with_fields, Event};
use crate::record::Record;

/// Address of a record image inside a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageLocation {
    pool: Uuid,
    page: usize,
    offset: usize,
}

impl PageLocation {
    /// Index of the page within its pool
    pub fn page(&self) -> usize {
        self.page
    }

    /// Byte offset of the image within its page
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Ordered list of pinned pages owned by one operator call
#[derive(Debug)]
pub struct PagePool {
    id: Uuid,
    label: &'static str,
    buffer: BufferManager,
    pages: Vec<PinnedPage>,
    records: usize,
    scratch: Vec<u8>,
}

impl PagePool {
    /// Creates an empty pool; `label` names it in log lines
    pub fn new(buffer: &BufferManager, label: &'static str) -> Self {
        Self {
            id: Uuid::new_v4(),
            label,
            buffer: buffer.clone(),
            pages: Vec::new(),
            records: 0,
            scratch: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn pages(&self) -> &[PinnedPage] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Records appended since creation or the last `clear`
    pub fn record_count(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Appends a raw image, opening a new page when the last one is full
    pub fn append(&mut self, image: &[u8]) -> StorageResult<PageLocation> {
        let page_size = self.buffer.page_size();
        if image.len() > Page::max_image_len(page_size) {
            return Err(StorageError::record_too_large(image.len(), page_size));
        }

        if let Some(last) = self.pages.last_mut() {
            if let Some(offset) = last.append(image) {
                self.records += 1;
                return Ok(self.location(self.pages.len() - 1, offset));
            }
        }

        let mut page = self.buffer.allocate();
        let offset = page.append(image).ok_or_else(|| {
            StorageError::record_too_large(image.len(), page_size)
        })?;
        self.pages.push(page);
        self.records += 1;

        let index = (self.pages.len() - 1).to_string();
        log_event_with_fields(
            Event::SpillPageAllocated,
            &[("pool", self.label), ("page", &index)],
        );
        Ok(self.location(self.pages.len() - 1, offset))
    }

    /// Appends the binary image of `record`
    pub fn append_record(&mut self, record: &Record) -> StorageResult<PageLocation> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        record.write_binary(&mut scratch);
        let result = self.append(&scratch);
        self.scratch = scratch;
        result
    }

    /// Decodes the image at `loc` into `record`
    pub fn read_into(&self, loc: PageLocation, record: &mut Record) -> StorageResult<()> {
        let page = self.page_for(loc)?;
        let image = page.image_at(loc.offset)?;
        record.from_binary(image)?;
        Ok(())
    }

    /// Replaces the image at `loc` with the image of `record`.
    ///
    /// The new image must have the same length as the stored one.
    pub fn overwrite(&mut self, loc: PageLocation, record: &Record) -> StorageResult<()> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        record.write_binary(&mut scratch);
        let result = self
            .page_for_mut(loc)
            .and_then(|page| page.overwrite_at(loc.offset, &scratch));
        self.scratch = scratch;
        result
    }

    /// Releases every page. Locations handed out earlier become stale.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.records = 0;
        self.id = Uuid::new_v4();
    }

    fn location(&self, page: usize, offset: usize) -> PageLocation {
        PageLocation {
            pool: self.id,
            page,
            offset,
        }
    }

    fn check_owner(&self, loc: PageLocation) -> StorageResult<()> {
        if loc.pool != self.id {
            return Err(StorageError::stale_location(format!(
                "location belongs to pool {}, not {} ({})",
                loc.pool, self.id, self.label
            )));
        }
        Ok(())
    }

    fn page_for(&self, loc: PageLocation) -> StorageResult<&PinnedPage> {
        self.check_owner(loc)?;
        self.pages.get(loc.page).ok_or_else(|| {
            StorageError::stale_location(format!("page {} not in pool {}", loc.page, self.label))
        })
    }

    fn page_for_mut(&mut self, loc: PageLocation) -> StorageResult<&mut PinnedPage> {
        self.check_owner(loc)?;
        let label = self.label;
        self.pages.get_mut(loc.page).ok_or_else(|| {
            StorageError::stale_location(format!("page {} not in pool {}", loc.page, label))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecConfig;
    use crate::record::{AttType, AttValue, Schema};
    use crate::storage::errors::StorageErrorCode;
    use std::sync::Arc;

    fn buffer() -> BufferManager {
        BufferManager::new(&ExecConfig::with_pages(64, 4))
    }

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::from_pairs([("k", AttType::Int), ("v", AttType::Int)]))
    }

    fn rec(k: i64, v: i64) -> Record {
        Record::from_values(schema(), vec![AttValue::Int(k), AttValue::Int(v)]).unwrap()
    }

    #[test]
    fn test_append_rolls_to_new_page() {
        let buffer = buffer();
        let mut pool = PagePool::new(&buffer, "test");
        // 16-byte image + 4-byte prefix, 3 per 64-byte page
        let locs: Vec<_> = (0..7).map(|i| pool.append_record(&rec(i, i)).unwrap()).collect();
        assert_eq!(pool.page_count(), 3);
        assert_eq!(pool.record_count(), 7);
        assert_eq!(locs[3].page(), 1);
        assert_eq!(buffer.pinned(), 3);

        let mut out = Record::new(schema());
        pool.read_into(locs[5], &mut out).unwrap();
        assert_eq!(out, rec(5, 5));
    }

    #[test]
    fn test_overwrite_in_place() {
        let buffer = buffer();
        let mut pool = PagePool::new(&buffer, "test");
        let loc = pool.append_record(&rec(1, 10)).unwrap();
        pool.overwrite(loc, &rec(1, 11)).unwrap();

        let mut out = Record::new(schema());
        pool.read_into(loc, &mut out).unwrap();
        assert_eq!(out, rec(1, 11));
    }

    #[test]
    fn test_foreign_location_rejected() {
        let buffer = buffer();
        let mut a = PagePool::new(&buffer, "a");
        let mut b = PagePool::new(&buffer, "b");
        let loc = a.append_record(&rec(1, 1)).unwrap();
        b.append_record(&rec(2, 2)).unwrap();

        let mut out = Record::new(schema());
        let err = b.read_into(loc, &mut out).unwrap_err();
        assert_eq!(err.code(), StorageErrorCode::RelStaleLocation);
    }

    #[test]
    fn test_clear_releases_pages_and_invalidates_locations() {
        let buffer = buffer();
        let mut pool = PagePool::new(&buffer, "test");
        let loc = pool.append_record(&rec(1, 1)).unwrap();
        pool.clear();
        assert_eq!(buffer.pinned(), 0);
        let mut out = Record::new(schema());
        assert!(pool.read_into(loc, &mut out).is_err());
    }

    #[test]
    fn test_oversized_image_rejected() {
        let buffer = buffer();
        let mut pool = PagePool::new(&buffer, "test");
        let err = pool.append(&[0u8; 61]).unwrap_err();
        assert_eq!(err.code(), StorageErrorCode::RelRecordTooLarge);
        assert_eq!(buffer.pinned(), 0);
        assert!(pool.append(&[0u8; 60]).is_ok());
    }

    #[test]
    fn test_drop_releases_pins() {
        let buffer = buffer();
        {
            let mut pool = PagePool::new(&buffer, "test");
            for i in 0..10 {
                pool.append_record(&rec(i, i)).unwrap();
            }
            assert!(buffer.pinned() > 0);
        }
        assert_eq!(buffer.pinned(), 0);
    }
}
