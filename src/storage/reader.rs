//! Table file reader with strict corruption detection
//!
//! Every header and page frame is checksum-verified. Any mismatch or truncation is
//! reported as REL_DATA_CORRUPTION (FATAL).

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{StorageError, StorageResult};
use super::page::Page;
use super::writer::{FORMAT_VERSION, MAGIC};
use crate::config::MIN_PAGE_SIZE;
use crate::record::Schema;

/// Upper bound on header string fields; anything larger is a corrupt length
const MAX_HEADER_FIELD: usize = 1 << 20;

/// Decoded table file header
#[derive(Debug, Clone)]
pub struct TableHeader {
    pub name: String,
    pub schema: Schema,
    pub page_size: usize,
    pub page_count: usize,
}

/// Sequential reader for one table file
pub struct TableReader {
    path: PathBuf,
    reader: BufReader<File>,
    page_size: usize,
    pages_read: usize,
}

impl TableReader {
    /// Opens the file at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = File::open(path).map_err(|e| {
            StorageError::io_error(format!("Failed to open table file: {}", path.display()), e)
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            page_size: 0,
            pages_read: 0,
        })
    }

    /// Returns the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads and verifies the header. Must be called before `read_page`.
    pub fn read_header(&mut self) -> StorageResult<TableHeader> {
        let mut header = Vec::new();

        let magic = self.read_exact_vec(4, "magic")?;
        if magic.as_slice() != MAGIC {
            return Err(StorageError::data_corruption(format!(
                "{} is not a table file",
                self.path.display()
            )));
        }
        header.extend_from_slice(&magic);

        let version = self.read_u32(&mut header, "version")?;
        if version != FORMAT_VERSION {
            return Err(StorageError::data_corruption(format!(
                "unsupported table file version {}",
                version
            )));
        }

        let page_size = self.read_u32(&mut header, "page size")? as usize;
        let name_len = self.read_u32(&mut header, "name length")? as usize;
        check_field_len(name_len, "name")?;
        let name_bytes = self.read_exact_vec(name_len, "name")?;
        header.extend_from_slice(&name_bytes);
        let schema_len = self.read_u32(&mut header, "schema length")? as usize;
        check_field_len(schema_len, "schema")?;
        let schema_bytes = self.read_exact_vec(schema_len, "schema")?;
        header.extend_from_slice(&schema_bytes);
        let page_count = self.read_u32(&mut header, "page count")? as usize;

        let stored = self.read_u32(&mut Vec::new(), "header checksum")?;
        if compute_checksum(&header) != stored {
            return Err(StorageError::data_corruption(format!(
                "header checksum mismatch in {}",
                self.path.display()
            )));
        }

        if page_size < MIN_PAGE_SIZE {
            return Err(StorageError::data_corruption(format!(
                "page size {} below minimum",
                page_size
            )));
        }

        let name = String::from_utf8(name_bytes)
            .map_err(|_| StorageError::data_corruption("table name is not UTF-8"))?;
        let schema: Schema = serde_json::from_slice(&schema_bytes)
            .map_err(|e| StorageError::data_corruption(format!("invalid schema JSON: {}", e)))?;

        self.page_size = page_size;
        Ok(TableHeader {
            name,
            schema,
            page_size,
            page_count,
        })
    }

    /// Reads and verifies the next page frame
    pub fn read_page(&mut self) -> StorageResult<Page> {
        let index = self.pages_read;
        let frame = self
            .read_exact_vec(4 + self.page_size + 4, "page frame")
            .map_err(|e| StorageError::corruption_at_page(index, e.message().to_string()))?;

        let (body, crc) = frame.split_at(4 + self.page_size);
        let stored = u32::from_le_bytes([crc[0], crc[1], crc[2], crc[3]]);
        if !verify_checksum(body, stored) {
            return Err(StorageError::corruption_at_page(index, "page checksum mismatch"));
        }

        let used = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
        if used > self.page_size {
            return Err(StorageError::corruption_at_page(
                index,
                format!("used length {} exceeds page size", used),
            ));
        }

        let page = Page::from_bytes(self.page_size, &body[4..4 + used])
            .map_err(|e| StorageError::corruption_at_page(index, e.message().to_string()))?;
        self.pages_read += 1;
        Ok(page)
    }

    fn read_u32(&mut self, header: &mut Vec<u8>, what: &str) -> StorageResult<u32> {
        let bytes = self.read_exact_vec(4, what)?;
        header.extend_from_slice(&bytes);
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_exact_vec(&mut self, len: usize, what: &str) -> StorageResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).map_err(|e| {
            StorageError::data_corruption(format!(
                "truncated {} in {}: {}",
                what,
                self.path.display(),
                e
            ))
        })?;
        Ok(buf)
    }
}

fn check_field_len(len: usize, what: &str) -> StorageResult<()> {
    if len > MAX_HEADER_FIELD {
        return Err(StorageError::data_corruption(format!(
            "{} length {} is implausible",
            what, len
        )));
    }
    Ok(())
}
