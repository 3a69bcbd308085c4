//! Range index over a single table attribute
//!
//! # Design Principles
//!
//! - In-memory only; rebuilt from the table with [`IndexedTable::build`]
//! - Deterministic: BTreeMap iteration order, row ids ascending within a key
//! - Closed-interval range lookups with bounds coerced to the key type

mod btree;
mod errors;

pub use btree::{IndexKey, IndexTree, IndexedTable};
pub use errors::{IndexError, IndexErrorCode, IndexResult};
