//! Buffer manager handle and pinned anonymous pages
//!
//! Operators allocate scratch pages (spill pages, sorted runs, join groups) from a
//! `BufferManager`. Every allocation is pinned until the `PinnedPage` is dropped,
//! so pages are released on every exit path, including `?` returns.
//!
//! The pool size is advisory: allocation never fails, but the pin count and its
//! high-water mark are tracked so callers and tests can check what a run used.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::page::Page;
use crate::config::ExecConfig;

#[derive(Debug, Default)]
struct PinStats {
    pinned: AtomicUsize,
    high_water: AtomicUsize,
    allocated: AtomicUsize,
}

impl PinStats {
    fn pin(&self) {
        let now = self.pinned.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        self.allocated.fetch_add(1, Ordering::SeqCst);
    }

    fn unpin(&self) {
        self.pinned.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Cloneable handle to the page allocator
#[derive(Debug, Clone)]
pub struct BufferManager {
    page_size: usize,
    buffer_pages: usize,
    run_pages: usize,
    stats: Arc<PinStats>,
}

impl BufferManager {
    /// Creates a buffer manager sized by `config`
    pub fn new(config: &ExecConfig) -> Self {
        Self {
            page_size: config.page_size,
            buffer_pages: config.buffer_pages,
            run_pages: config.run_pages(),
            stats: Arc::new(PinStats::default()),
        }
    }

    /// Bytes per page
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages the pool is sized for
    pub fn buffer_pages(&self) -> usize {
        self.buffer_pages
    }

    /// Input pages sorted in memory per run
    pub fn run_pages(&self) -> usize {
        self.run_pages
    }

    /// Allocates a new empty page, pinned until the returned handle is dropped
    pub fn allocate(&self) -> PinnedPage {
        self.stats.pin();
        PinnedPage {
            page: Page::new(self.page_size),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Pages currently pinned
    pub fn pinned(&self) -> usize {
        self.stats.pinned.load(Ordering::SeqCst)
    }

    /// Most pages ever pinned at once
    pub fn high_water(&self) -> usize {
        self.stats.high_water.load(Ordering::SeqCst)
    }

    /// Total pages allocated over the handle's lifetime
    pub fn allocated(&self) -> usize {
        self.stats.allocated.load(Ordering::SeqCst)
    }
}

/// An anonymous page pinned in the buffer pool
#[derive(Debug)]
pub struct PinnedPage {
    page: Page,
    stats: Arc<PinStats>,
}

impl Deref for PinnedPage {
    type Target = Page;

    fn deref(&self) -> &Page {
        &self.page
    }
}

impl DerefMut for PinnedPage {
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.page
    }
}

impl AsRef<Page> for PinnedPage {
    fn as_ref(&self) -> &Page {
        &self.page
    }
}

impl Drop for PinnedPage {
    fn drop(&mut self) {
        self.stats.unpin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> BufferManager {
        BufferManager::new(&ExecConfig::with_pages(128, 4))
    }

    #[test]
    fn test_allocate_pins_and_drop_releases() {
        let buffer = buffer();
        let a = buffer.allocate();
        let b = buffer.allocate();
        assert_eq!(buffer.pinned(), 2);
        assert_eq!(a.capacity(), 128);
        drop(a);
        assert_eq!(buffer.pinned(), 1);
        drop(b);
        assert_eq!(buffer.pinned(), 0);
        assert_eq!(buffer.high_water(), 2);
        assert_eq!(buffer.allocated(), 2);
    }

    #[test]
    fn test_clones_share_stats() {
        let buffer = buffer();
        let clone = buffer.clone();
        let _page = clone.allocate();
        assert_eq!(buffer.pinned(), 1);
    }

    #[test]
    fn test_allocation_beyond_pool_size_is_tracked() {
        let buffer = buffer();
        let pages: Vec<_> = (0..6).map(|_| buffer.allocate()).collect();
        assert_eq!(buffer.pinned(), 6);
        assert!(buffer.high_water() > buffer.buffer_pages());
        drop(pages);
        assert_eq!(buffer.pinned(), 0);
    }

    #[test]
    fn test_run_pages_from_config() {
        assert_eq!(buffer().run_pages(), 2);
    }
}
