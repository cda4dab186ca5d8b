//! # Growable Ordinal Table
//!
//! Open-addressing table from composite key hash to record ordinal.
//!
//! - Insert-if-absent: the first ordinal bound to a hash keeps it.
//! - Linear probing from a Fibonacci-mixed home slot.
//! - Capacity is a power of two and doubles whenever an insert would push the
//!   entry count past `capacity * load_factor`.
//! - Rehash builds the new slot array completely before it replaces the old.

use crate::config::IndexConfig;
use crate::error::{KeyIndexError, Result};
use crate::model::Ordinal;
use tracing::debug;

const GOLDEN_RATIO: u64 = 0x9e37_79b9_7f4a_7c15;
const MIN_CAPACITY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    hash: u64,
    ordinal: Ordinal,
}

/// Hash-to-ordinal table for one record type
#[derive(Debug, Clone)]
pub struct OrdinalTable {
    type_name: String,
    slots: Box<[Option<Slot>]>,
    len: usize,
    load_factor: f64,
    max_capacity: Option<usize>,
    rehashes: u32,
}

impl OrdinalTable {
    /// Create an empty table sized by `config.initial_capacity`.
    ///
    /// Fails with `InvalidConfig` when `config` does not validate.
    pub fn new(type_name: impl Into<String>, config: &IndexConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| KeyIndexError::InvalidConfig(e.to_string()))?;

        let capacity = config.initial_capacity.max(MIN_CAPACITY).next_power_of_two();
        Ok(Self {
            type_name: type_name.into(),
            slots: empty_slots(capacity),
            len: 0,
            load_factor: config.load_factor,
            max_capacity: config.max_capacity,
            rehashes: 0,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of bound hashes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rehashes performed since this table was created
    pub fn rehash_count(&self) -> u32 {
        self.rehashes
    }

    /// Most entries `capacity` slots may hold. Always leaves one slot free so
    /// probes for absent hashes terminate.
    fn threshold(&self, capacity: usize) -> usize {
        let limit = (capacity as f64 * self.load_factor) as usize;
        limit.min(capacity - 1)
    }

    /// Smallest capacity reachable by doubling that holds `entries`
    fn capacity_for(&self, entries: usize) -> Result<usize> {
        let mut capacity = self.capacity();
        while entries > self.threshold(capacity) {
            capacity = capacity
                .checked_mul(2)
                .ok_or_else(|| self.exhausted(usize::MAX))?;
        }
        Ok(capacity)
    }

    fn exhausted(&self, required: usize) -> KeyIndexError {
        KeyIndexError::CapacityExhausted {
            type_name: self.type_name.clone(),
            required,
            limit: self.max_capacity.unwrap_or(usize::MAX),
        }
    }

    /// Check that `additional` more entries fit under the configured maximum
    /// without touching the table. Returns the capacity they would need.
    pub fn check_room(&self, additional: usize) -> Result<usize> {
        let entries = self
            .len
            .checked_add(additional)
            .ok_or_else(|| self.exhausted(usize::MAX))?;
        let required = self.capacity_for(entries)?;
        match self.max_capacity {
            Some(limit) if required > limit => Err(self.exhausted(required)),
            _ => Ok(required),
        }
    }

    /// Grow ahead of a bulk load of `additional` entries
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let required = self.check_room(additional)?;
        if required > self.capacity() {
            self.rehash(required)?;
        }
        Ok(())
    }

    #[inline]
    fn home_slot(&self, hash: u64) -> usize {
        let shift = 64 - self.capacity().trailing_zeros();
        hash.wrapping_mul(GOLDEN_RATIO).checked_shr(shift).unwrap_or(0) as usize
    }

    /// Probe for `hash`: `Ok(index)` of its slot, or `Err(index)` of the
    /// first free slot where it would go.
    fn find(&self, hash: u64) -> std::result::Result<usize, usize> {
        let mask = self.capacity() - 1;
        let mut index = self.home_slot(hash);
        loop {
            match self.slots[index] {
                Some(slot) if slot.hash == hash => return Ok(index),
                Some(_) => index = (index + 1) & mask,
                None => return Err(index),
            }
        }
    }

    /// Bind `hash` to `ordinal` unless the hash is already bound.
    ///
    /// Returns whether the binding was inserted. Grows the table first when
    /// needed; on `CapacityExhausted` the table is left unchanged.
    pub fn insert_if_absent(&mut self, hash: u64, ordinal: Ordinal) -> Result<bool> {
        if self.find(hash).is_ok() {
            return Ok(false);
        }

        if self.len + 1 > self.threshold(self.capacity()) {
            let required = self.check_room(1)?;
            self.rehash(required)?;
        }

        match self.find(hash) {
            Ok(_) => Ok(false),
            Err(index) => {
                self.slots[index] = Some(Slot { hash, ordinal });
                self.len += 1;
                Ok(true)
            }
        }
    }

    /// Ordinal bound to `hash`, if any
    pub fn lookup_ordinal(&self, hash: u64) -> Option<Ordinal> {
        self.find(hash)
            .ok()
            .and_then(|index| self.slots[index])
            .map(|slot| slot.ordinal)
    }

    pub fn contains(&self, hash: u64) -> bool {
        self.find(hash).is_ok()
    }

    /// Move every binding into fresh storage of at least `new_capacity` slots.
    ///
    /// The capacity is rounded up to a power of two large enough for the
    /// current entries. Bindings are carried over unchanged.
    pub fn rehash(&mut self, new_capacity: usize) -> Result<()> {
        let minimum = self.capacity_for(self.len)?;
        let mut capacity = new_capacity.max(MIN_CAPACITY).max(minimum);
        if !capacity.is_power_of_two() {
            capacity = capacity
                .checked_next_power_of_two()
                .ok_or_else(|| self.exhausted(usize::MAX))?;
        }
        if let Some(limit) = self.max_capacity {
            if capacity > limit {
                return Err(self.exhausted(capacity));
            }
        }

        let previous = self.capacity();
        let mut fresh = OrdinalTable {
            type_name: String::new(),
            slots: empty_slots(capacity),
            len: 0,
            load_factor: self.load_factor,
            max_capacity: self.max_capacity,
            rehashes: 0,
        };
        for slot in self.slots.iter().flatten() {
            if let Err(index) = fresh.find(slot.hash) {
                fresh.slots[index] = Some(*slot);
                fresh.len += 1;
            }
        }

        self.slots = fresh.slots;
        self.rehashes += 1;
        debug!(
            type_name = %self.type_name,
            from = previous,
            to = capacity,
            entries = self.len,
            "rehashed ordinal table"
        );
        Ok(())
    }

    /// Drop every binding, keeping the current capacity
    pub fn clear(&mut self) {
        self.slots.fill(None);
        self.len = 0;
    }

    /// All `(hash, ordinal)` bindings in slot order
    pub fn iter(&self) -> impl Iterator<Item = (u64, Ordinal)> + '_ {
        self.slots
            .iter()
            .flatten()
            .map(|slot| (slot.hash, slot.ordinal))
    }

    /// Distinct ordinals bound in the table, ascending
    pub fn ordinals(&self) -> Vec<Ordinal> {
        let mut ordinals: Vec<Ordinal> = self.iter().map(|(_, ordinal)| ordinal).collect();
        ordinals.sort_unstable();
        ordinals.dedup();
        ordinals
    }
}

fn empty_slots(capacity: usize) -> Box<[Option<Slot>]> {
    vec![None; capacity].into_boxed_slice()
}
