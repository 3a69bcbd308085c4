//! Group table for hash aggregation
//!
//! Maps the hash of a grouping key to the spill location of that group's
//! running record. Every entry keeps the decoded key, and a lookup only
//! succeeds when the stored key equals the probe, so distinct keys sharing a
//! hash chain in the same bucket instead of merging.

use std::collections::HashMap;

use crate::record::AttValue;
use crate::storage::PageLocation;

#[derive(Debug)]
struct GroupEntry {
    key: Vec<AttValue>,
    location: PageLocation,
}

/// Hash-addressed map from grouping key to spill location
#[derive(Debug, Default)]
pub struct GroupTable {
    buckets: HashMap<u64, Vec<GroupEntry>>,
    /// Locations in first-seen order
    order: Vec<PageLocation>,
    collisions: usize,
}

impl GroupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// XOR-fold of the per-value hashes. The empty key hashes to 0.
    pub fn hash_key(key: &[AttValue]) -> u64 {
        key.iter().fold(0, |acc, v| acc ^ v.hash_value())
    }

    /// Location of the group whose key equals `key`
    pub fn lookup(&self, hash: u64, key: &[AttValue]) -> Option<PageLocation> {
        self.buckets
            .get(&hash)?
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.location)
    }

    /// Records a new group.
    ///
    /// Returns true when the bucket already held a different key, i.e. the
    /// insert was a hash collision. The caller must have checked `lookup` first.
    pub fn insert(&mut self, hash: u64, key: Vec<AttValue>, location: PageLocation) -> bool {
        let bucket = self.buckets.entry(hash).or_default();
        let collided = !bucket.is_empty();
        bucket.push(GroupEntry { key, location });
        self.order.push(location);
        if collided {
            self.collisions += 1;
        }
        collided
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// Group locations in the order the groups were first seen
    pub fn locations(&self) -> impl Iterator<Item = PageLocation> + '_ {
        self.order.iter().copied()
    }
}
