//! Paged tables and the output sink contract

use std::path::Path;
use std::sync::Arc;

use super::errors::{StorageError, StorageResult};
use super::page::Page;
use super::reader::TableReader;
use super::writer::TableWriter;
use crate::observability::{log_event_with_fields, Event};
use crate::record::{Record, Schema};

/// Destination for operator output rows.
///
/// The sink's schema is fixed before an operator runs; operators check arity
/// against it at setup and never change it.
pub trait RecordSink {
    /// Schema every appended record must carry
    fn schema(&self) -> &Arc<Schema>;

    /// Appends one fully-formed row
    fn append(&mut self, record: &Record) -> StorageResult<()>;
}

/// Position of a row within its table. Ordering follows table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId {
    pub page: usize,
    pub offset: usize,
}

/// A named table stored as a list of fixed-size pages
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    schema: Arc<Schema>,
    page_size: usize,
    pages: Vec<Page>,
    rows: usize,
    scratch: Vec<u8>,
}

impl Table {
    /// Creates an empty table
    pub fn new(name: impl Into<String>, schema: Arc<Schema>, page_size: usize) -> Self {
        Self {
            name: name.into(),
            schema,
            page_size,
            pages: Vec::new(),
            rows: 0,
            scratch: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Appends a row to the last page, opening a new page when it is full
    pub fn append_record(&mut self, record: &Record) -> StorageResult<RowId> {
        if **record.schema() != *self.schema {
            return Err(StorageError::schema_mismatch(&self.name));
        }

        let mut image = std::mem::take(&mut self.scratch);
        image.clear();
        record.write_binary(&mut image);
        let result = self.append_image(&image);
        self.scratch = image;
        result
    }

    fn append_image(&mut self, image: &[u8]) -> StorageResult<RowId> {
        if image.len() > Page::max_image_len(self.page_size) {
            return Err(StorageError::record_too_large(image.len(), self.page_size));
        }
        let in_last = self.pages.last_mut().and_then(|page| page.append(image));
        let offset = match in_last {
            Some(offset) => offset,
            None => {
                let mut page = Page::new(self.page_size);
                let offset = page
                    .append(image)
                    .ok_or_else(|| StorageError::record_too_large(image.len(), self.page_size))?;
                self.pages.push(page);
                offset
            }
        };
        self.rows += 1;
        Ok(RowId {
            page: self.pages.len() - 1,
            offset,
        })
    }

    /// Decodes the row at `row` into `record`
    pub fn read_into(&self, row: RowId, record: &mut Record) -> StorageResult<()> {
        let page = self.pages.get(row.page).ok_or_else(|| {
            StorageError::stale_location(format!("page {} not in table '{}'", row.page, self.name))
        })?;
        record.from_binary(page.image_at(row.offset)?)?;
        Ok(())
    }

    /// Decodes every row in page order
    pub fn rows(&self) -> StorageResult<Vec<Record>> {
        let mut out = Vec::with_capacity(self.rows);
        for page in &self.pages {
            for image in page.images() {
                let mut record = Record::new(Arc::clone(&self.schema));
                record.from_binary(image)?;
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Writes the table to `path`, replacing any existing file
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        let mut writer = TableWriter::create(path, self.page_size)?;
        writer.write_header(&self.name, &self.schema, self.pages.len())?;
        for page in &self.pages {
            writer.write_page(page)?;
        }
        writer.finish()?;

        let pages = self.pages.len().to_string();
        let rows = self.rows.to_string();
        log_event_with_fields(
            Event::TableSaved,
            &[("table", &self.name), ("pages", &pages), ("rows", &rows)],
        );
        Ok(())
    }

    /// Reads a table written by [`Table::save`].
    ///
    /// Any checksum mismatch or malformed page fails with REL_DATA_CORRUPTION.
    pub fn load(path: &Path) -> StorageResult<Self> {
        match Self::load_inner(path) {
            Ok(table) => {
                let pages = table.pages.len().to_string();
                let rows = table.rows.to_string();
                log_event_with_fields(
                    Event::TableLoaded,
                    &[("table", &table.name), ("pages", &pages), ("rows", &rows)],
                );
                Ok(table)
            }
            Err(err) => {
                if err.is_fatal() {
                    let path = path.display().to_string();
                    log_event_with_fields(
                        Event::DataCorruption,
                        &[("path", &path), ("reason", err.message())],
                    );
                }
                Err(err)
            }
        }
    }

    fn load_inner(path: &Path) -> StorageResult<Self> {
        let mut reader = TableReader::open(path)?;
        let header = reader.read_header()?;
        let schema = Arc::new(header.schema);

        let mut table = Table::new(header.name, Arc::clone(&schema), header.page_size);
        let mut probe = Record::new(schema);
        for index in 0..header.page_count {
            let page = reader.read_page()?;
            for image in page.images() {
                let consumed = probe
                    .from_binary(image)
                    .map_err(|e| StorageError::corruption_at_page(index, e.to_string()))?;
                if consumed != image.len() {
                    return Err(StorageError::corruption_at_page(
                        index,
                        format!("image has {} trailing bytes", image.len() - consumed),
                    ));
                }
            }
            table.rows += page.record_count();
            table.pages.push(page);
        }
        Ok(table)
    }
}

impl RecordSink for Table {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn append(&mut self, record: &Record) -> StorageResult<()> {
        self.append_record(record).map(|_| ())
    }
}
