//! Table file writer
//!
//! File layout:
//!
//! ```text
//! +--------------------+
//! | Magic "RELT"       | (4 bytes)
//! +--------------------+
//! | Version            | (u32 LE)
//! +--------------------+
//! | Page size          | (u32 LE)
//! +--------------------+
//! | Table name         | (u32 LE length + UTF-8)
//! +--------------------+
//! | Schema JSON        | (u32 LE length + UTF-8)
//! +--------------------+
//! | Page count         | (u32 LE)
//! +--------------------+
//! | Header checksum    | (u32 LE, CRC32 of everything above)
//! +--------------------+
//! | Page 0             | used (u32 LE) + page_size bytes + CRC32 (u32 LE)
//! | ...                |
//! +--------------------+
//! ```
//!
//! Pages are written zero-padded to the full page size so every page frame has
//! the same length. The page checksum covers the used-length field and the padded
//! page bytes.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::checksum::{compute_checksum, frame_checksum};
use super::errors::{StorageError, StorageResult};
use super::page::Page;
use crate::record::Schema;

pub(crate) const MAGIC: &[u8; 4] = b"RELT";
pub(crate) const FORMAT_VERSION: u32 = 1;

/// Sequential writer for one table file
pub struct TableWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    page_size: usize,
    pages_written: usize,
}

impl TableWriter {
    /// Creates (or truncates) the file at `path`
    pub fn create(path: &Path, page_size: usize) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                StorageError::io_error(
                    format!("Failed to create table file: {}", path.display()),
                    e,
                )
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            page_size,
            pages_written: 0,
        })
    }

    /// Returns the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the checksummed header
    pub fn write_header(
        &mut self,
        name: &str,
        schema: &Schema,
        page_count: usize,
    ) -> StorageResult<()> {
        let schema_json = serde_json::to_vec(schema).map_err(|e| {
            StorageError::io_error(
                "Failed to serialize schema",
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;

        let mut header = Vec::with_capacity(32 + name.len() + schema_json.len());
        header.extend_from_slice(MAGIC);
        header.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        header.extend_from_slice(&(self.page_size as u32).to_le_bytes());
        header.extend_from_slice(&(name.len() as u32).to_le_bytes());
        header.extend_from_slice(name.as_bytes());
        header.extend_from_slice(&(schema_json.len() as u32).to_le_bytes());
        header.extend_from_slice(&schema_json);
        header.extend_from_slice(&(page_count as u32).to_le_bytes());
        let checksum = compute_checksum(&header);
        header.extend_from_slice(&checksum.to_le_bytes());

        self.write_bytes(&header, "header")
    }

    /// Writes one page frame
    pub fn write_page(&mut self, page: &Page) -> StorageResult<()> {
        let mut frame = Vec::with_capacity(self.page_size + 8);
        frame.extend_from_slice(&(page.used() as u32).to_le_bytes());
        frame.extend_from_slice(page.as_bytes());
        frame.resize(4 + self.page_size, 0);
        let checksum = frame_checksum(page.used(), page.as_bytes(), self.page_size);
        frame.extend_from_slice(&checksum.to_le_bytes());

        let what = format!("page {}", self.pages_written);
        self.write_bytes(&frame, &what)?;
        self.pages_written += 1;
        Ok(())
    }

    /// Flushes and fsyncs the file
    pub fn finish(mut self) -> StorageResult<()> {
        self.writer.flush().map_err(|e| {
            StorageError::io_error(format!("Failed to flush {}", self.path.display()), e)
        })?;
        self.writer.get_ref().sync_all().map_err(|e| {
            StorageError::io_error(format!("fsync failed for {}", self.path.display()), e)
        })
    }

    fn write_bytes(&mut self, bytes: &[u8], what: &str) -> StorageResult<()> {
        self.writer.write_all(bytes).map_err(|e| {
            StorageError::io_error(
                format!("Failed to write {} of {}", what, self.path.display()),
                e,
            )
        })
    }
}
