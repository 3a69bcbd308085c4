//! Fixed-capacity pages of length-prefixed record images
//!
//! ```text
//! +-----------+-----------------+-----------+-----------------+---- ...
//! | len (u32) | image (len B)   | len (u32) | image (len B)   |
//! +-----------+-----------------+-----------+-----------------+---- ...
//! ```
//!
//! An offset names the start of a length prefix. Offsets are stable: nothing is
//! ever moved once appended.

use super::errors::{StorageError, StorageResult};

/// Bytes of length prefix in front of every image
pub const SLOT_HEADER: usize = 4;

/// A fixed-capacity page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    data: Vec<u8>,
    capacity: usize,
    offsets: Vec<usize>,
}

impl Page {
    /// Creates an empty page of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            offsets: Vec::new(),
        }
    }

    /// Largest image an empty page of `capacity` bytes can hold
    pub fn max_image_len(capacity: usize) -> usize {
        capacity.saturating_sub(SLOT_HEADER)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes in use, prefixes included
    pub fn used(&self) -> usize {
        self.data.len()
    }

    pub fn record_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offsets of every image, in append order
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Returns true if an image of `len` bytes fits in the remaining space
    pub fn fits(&self, len: usize) -> bool {
        self.data.len() + SLOT_HEADER + len <= self.capacity
    }

    /// Appends an image and returns its offset.
    ///
    /// Returns `None` without touching the page when the image does not fit.
    pub fn append(&mut self, image: &[u8]) -> Option<usize> {
        if !self.fits(image.len()) {
            return None;
        }
        let offset = self.data.len();
        self.data
            .extend_from_slice(&(image.len() as u32).to_le_bytes());
        self.data.extend_from_slice(image);
        self.offsets.push(offset);
        Some(offset)
    }

    /// Returns the image stored at `offset`
    pub fn image_at(&self, offset: usize) -> StorageResult<&[u8]> {
        let (start, end) = self.bounds(offset)?;
        Ok(&self.data[start..end])
    }

    /// Replaces the image at `offset` with one of identical length
    pub fn overwrite_at(&mut self, offset: usize, image: &[u8]) -> StorageResult<()> {
        let (start, end) = self.bounds(offset)?;
        if end - start != image.len() {
            return Err(StorageError::size_changed(end - start, image.len()));
        }
        self.data[start..end].copy_from_slice(image);
        Ok(())
    }

    /// Iterates over `(offset, image)` pairs in append order
    pub fn entries(&self) -> impl Iterator<Item = (usize, &[u8])> + '_ {
        self.offsets.iter().filter_map(move |&offset| {
            self.bounds(offset)
                .ok()
                .map(|(start, end)| (offset, &self.data[start..end]))
        })
    }

    /// Iterates over images in append order
    pub fn images(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.entries().map(|(_, image)| image)
    }

    /// The used bytes, as written to disk
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Rebuilds a page from its used bytes, validating every length prefix
    pub fn from_bytes(capacity: usize, bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() > capacity {
            return Err(StorageError::data_corruption(format!(
                "page holds {} bytes, capacity is {}",
                bytes.len(),
                capacity
            )));
        }

        let mut offsets = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let header = bytes.get(pos..pos + SLOT_HEADER).ok_or_else(|| {
                StorageError::data_corruption(format!("truncated length prefix at offset {}", pos))
            })?;
            let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
            let end = pos + SLOT_HEADER + len;
            if end > bytes.len() {
                return Err(StorageError::data_corruption(format!(
                    "image at offset {} overruns page ({} > {})",
                    pos,
                    end,
                    bytes.len()
                )));
            }
            offsets.push(pos);
            pos = end;
        }

        let mut data = Vec::with_capacity(capacity);
        data.extend_from_slice(bytes);
        Ok(Self {
            data,
            capacity,
            offsets,
        })
    }

    fn bounds(&self, offset: usize) -> StorageResult<(usize, usize)> {
        if self.offsets.binary_search(&offset).is_err() {
            return Err(StorageError::stale_location(format!(
                "no record starts at offset {}",
                offset
            )));
        }
        let header = &self.data[offset..offset + SLOT_HEADER];
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let start = offset + SLOT_HEADER;
        Ok((start, start + len))
    }
}

impl AsRef<Page> for Page {
    fn as_ref(&self) -> &Page {
        self
    }
}
