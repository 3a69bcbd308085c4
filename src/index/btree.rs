//! BTreeMap-based single-attribute index over a table
//!
//! The index maps key values to the row ids holding them. Row ids within a key
//! are kept ascending, so a range scan yields key order with ties in table order.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use super::errors::{IndexError, IndexResult};
use crate::record::{AttType, AttValue, Record, Schema};
use crate::storage::{RecordSink, RowId, StorageResult, Table};

/// Index key derived from an attribute value.
///
/// Float keys are stored as order-preserving bits so the derived `Ord` matches
/// numeric order. An index holds keys of a single variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IndexKey {
    /// Boolean value (false < true)
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value (stored as bits for total ordering)
    Float(u64),
    /// String value
    String(String),
}

impl IndexKey {
    /// Create a key from a float
    ///
    /// Uses bit representation for total ordering.
    pub fn from_float(v: f64) -> Self {
        let bits = v.to_bits();
        let ordered = if (bits >> 63) == 1 {
            !bits // Negative: flip all bits
        } else {
            bits ^ (1 << 63) // Positive: flip sign bit
        };
        IndexKey::Float(ordered)
    }

    /// Create a key from an attribute value
    pub fn from_value(value: &AttValue) -> Self {
        match value {
            AttValue::Bool(b) => IndexKey::Bool(*b),
            AttValue::Int(i) => IndexKey::Int(*i),
            AttValue::Double(d) => IndexKey::from_float(*d),
            AttValue::String(s) => IndexKey::String(s.clone()),
        }
    }
}

/// Ordered map from key to row ids
#[derive(Debug, Default, Clone)]
pub struct IndexTree {
    tree: BTreeMap<IndexKey, Vec<RowId>>,
}

impl IndexTree {
    pub fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    /// Insert a row id for a key, keeping row ids ascending
    pub fn insert(&mut self, key: IndexKey, row: RowId) {
        let rows = self.tree.entry(key).or_default();
        match rows.binary_search(&row) {
            Ok(_) => {}
            Err(pos) => rows.insert(pos, row),
        }
    }

    /// Row ids for an exact key match
    pub fn lookup_eq(&self, key: &IndexKey) -> Vec<RowId> {
        self.tree.get(key).cloned().unwrap_or_default()
    }

    /// Row ids with keys in the closed interval [low, high], in key order.
    ///
    /// Empty when low > high.
    pub fn lookup_range(&self, low: &IndexKey, high: &IndexKey) -> Vec<RowId> {
        self.range_iter(low, high).collect()
    }

    /// Lazily walks the row ids of [low, high] in key order.
    ///
    /// Nothing is buffered beyond the current key's row list.
    pub fn range_iter<'t>(
        &'t self,
        low: &IndexKey,
        high: &IndexKey,
    ) -> impl Iterator<Item = RowId> + 't {
        // BTreeMap::range panics on inverted bounds
        let entries = (low <= high).then(|| {
            self.tree
                .range((Bound::Included(low.clone()), Bound::Included(high.clone())))
        });
        entries
            .into_iter()
            .flatten()
            .flat_map(|(_, rows)| rows.iter().copied())
    }

    /// Returns the number of distinct keys
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }

    /// Returns the total number of row ids
    pub fn row_count(&self) -> usize {
        self.tree.values().map(|v| v.len()).sum()
    }
}

/// A table together with an index on one of its attributes
#[derive(Debug, Clone)]
pub struct IndexedTable {
    table: Table,
    key_slot: usize,
    key_type: AttType,
    tree: IndexTree,
}

impl IndexedTable {
    /// Indexes every existing row of `table` on attribute `key_att`
    pub fn build(table: Table, key_att: &str) -> IndexResult<Self> {
        let (key_slot, key_type) = table.schema().find(key_att).ok_or_else(|| {
            IndexError::build_failed(format!(
                "table '{}' has no attribute '{}'",
                table.name(),
                key_att
            ))
        })?;

        let mut tree = IndexTree::new();
        let mut record = Record::new(Arc::clone(table.schema()));
        for (page_no, page) in table.pages().iter().enumerate() {
            for (offset, image) in page.entries() {
                record.from_binary(image)?;
                let row = RowId {
                    page: page_no,
                    offset,
                };
                tree.insert(IndexKey::from_value(record.att(key_slot)?), row);
            }
        }

        Ok(Self {
            table,
            key_slot,
            key_type,
            tree,
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.table.schema()
    }

    /// Type of the indexed attribute
    pub fn key_type(&self) -> AttType {
        self.key_type
    }

    /// Slot of the indexed attribute
    pub fn key_slot(&self) -> usize {
        self.key_slot
    }

    pub fn tree(&self) -> &IndexTree {
        &self.tree
    }

    /// Appends a row to the table and indexes it
    pub fn insert(&mut self, record: &Record) -> StorageResult<RowId> {
        let row = self.table.append_record(record)?;
        let key = IndexKey::from_value(record.att(self.key_slot)?);
        self.tree.insert(key, row);
        Ok(row)
    }

    /// Row ids with keys in the closed interval [low, high].
    ///
    /// Bounds are coerced to the key type; an int bound on a double key widens.
    pub fn range(&self, low: &AttValue, high: &AttValue) -> IndexResult<Vec<RowId>> {
        let (low, high) = self.range_keys(low, high)?;
        Ok(self.tree.lookup_range(&low, &high))
    }

    /// Coerces both bounds to index keys without touching the tree
    pub fn range_keys(&self, low: &AttValue, high: &AttValue) -> IndexResult<(IndexKey, IndexKey)> {
        Ok((self.bound_key(low)?, self.bound_key(high)?))
    }

    fn bound_key(&self, bound: &AttValue) -> IndexResult<IndexKey> {
        if !self.key_type.accepts(bound.att_type()) {
            return Err(IndexError::key_mismatch(self.key_type, bound.att_type()));
        }
        let coerced = bound.clone().coerce_to(self.key_type, "range bound")?;
        Ok(IndexKey::from_value(&coerced))
    }
}

impl RecordSink for IndexedTable {
    fn schema(&self) -> &Arc<Schema> {
        self.table.schema()
    }

    fn append(&mut self, record: &Record) -> StorageResult<()> {
        self.insert(record).map(|_| ())
    }
}
