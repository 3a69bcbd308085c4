//! Page store
//!
//! Tables are lists of fixed-size pages holding length-prefixed record images.
//! Operators get scratch space from a [`BufferManager`] as [`PagePool`]s of pinned
//! pages that are released when the pool is dropped.
//!
//! # Design Principles
//!
//! - Append-only pages; an image never moves once written
//! - Appending to a full page leaves it untouched and reports "no location"
//! - Locations are owned handles validated against the pool that issued them
//! - Table files are checksum-verified on every load; a mismatch is fatal

mod buffer;
mod checksum;
mod errors;
mod page;
mod pool;
mod reader;
mod table;
mod writer;

pub use buffer::{BufferManager, PinnedPage};
pub use checksum::compute_checksum;
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use page::{Page, SLOT_HEADER};
pub use pool::{PageLocation, PagePool};
pub use reader::{TableHeader, TableReader};
pub use table::{RecordSink, RowId, Table};
pub use writer::TableWriter;
