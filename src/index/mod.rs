//! Component D: build-time primary-key hash index (spec §4.D).
//!
//! An in-memory, linear-hashed, open-chained table mapping a node's external
//! primary key to its dense node offset. Slots are pre-sized by
//! [`PrimaryKeyIndex::bulk_reserve`]; concurrent [`PrimaryKeyIndex::append`]
//! calls only ever lock the slot chain they land in, plus a single global
//! mutex for overflow-slot allocation.

use parking_lot::Mutex;
use xxhash_rust::xxh64::xxh64;

use crate::pager::overflow::{InlineString, OverflowFile, PageByteCursor};
use crate::types::{IdType, NodeOffset};

/// Entries per slot before overflow chaining kicks in.
pub const SLOT_CAPACITY: usize = 128;
const LOAD_FACTOR: f64 = 0.8;
const HASH_SEED: u64 = 0x5bd1_e995;

/// A node's external key, either an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue {
    Int64(i64),
    Str(String),
}

impl KeyValue {
    fn hash(&self) -> u64 {
        match self {
            KeyValue::Int64(v) => xxh64(&v.to_le_bytes(), HASH_SEED),
            KeyValue::Str(s) => xxh64(s.as_bytes(), HASH_SEED),
        }
    }

    pub fn id_type(&self) -> IdType {
        match self {
            KeyValue::Int64(_) => IdType::Int64,
            KeyValue::Str(_) => IdType::String,
        }
    }
}

/// One stored entry: the key (as written on disk, string keys resolved
/// through `overflow`) plus the dense offset it maps to.
#[derive(Debug, Clone)]
struct Entry {
    key: KeyValue,
    offset: NodeOffset,
}

struct Slot {
    entries: Vec<Entry>,
    overflow: Option<usize>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            entries: Vec::with_capacity(SLOT_CAPACITY),
            overflow: None,
        }
    }
}

/// Build-time hash index for one node label's primary key.
pub struct PrimaryKeyIndex {
    id_type: IdType,
    #[allow(dead_code)] // retained for incremental split support, not yet implemented
    level: u32,
    level_hash_mask: u64,
    higher_level_hash_mask: u64,
    next_split_slot_id: u64,
    primary_slots: Vec<Mutex<Slot>>,
    overflow_slots: Mutex<Vec<Mutex<Slot>>>,
    overflow_alloc: Mutex<()>,
    entry_count: std::sync::atomic::AtomicU64,
}

impl PrimaryKeyIndex {
    /// `bulkReserve` (spec §4.D): sizes the primary slot array for `n`
    /// expected entries at the configured load factor.
    pub fn bulk_reserve(id_type: IdType, n: u64) -> Self {
        let required_slots = ((n as f64) / (SLOT_CAPACITY as f64 * LOAD_FACTOR)).ceil() as u64;
        let required_slots = required_slots.max(1);
        // Smallest power-of-two level L with 2^{L+1} >= requiredSlots.
        let level = required_slots.next_power_of_two().trailing_zeros().saturating_sub(1);
        let base = 1u64 << level;
        let next_split_slot_id = required_slots.saturating_sub(base);

        let mut primary_slots = Vec::with_capacity(required_slots as usize);
        for _ in 0..required_slots {
            primary_slots.push(Mutex::new(Slot::empty()));
        }

        Self {
            id_type,
            level,
            level_hash_mask: (1u64 << (level + 1)) - 1,
            higher_level_hash_mask: (1u64 << (level + 2)) - 1,
            next_split_slot_id,
            primary_slots,
            overflow_slots: Mutex::new(Vec::new()),
            overflow_alloc: Mutex::new(()),
            entry_count: std::sync::atomic::AtomicU64::new(0),
        }
    }

    fn slot_id(&self, key_hash: u64) -> u64 {
        let low = key_hash & self.level_hash_mask;
        if low < self.next_split_slot_id {
            key_hash & self.higher_level_hash_mask
        } else {
            low
        }
    }

    /// `append` (spec §4.D): inserts `key -> offset`, returning `false` on a
    /// duplicate key. Lock-free across distinct primary slots; contends only
    /// within one key's chain and, on overflow growth, the global allocator.
    pub fn append(&self, key: KeyValue, offset: NodeOffset) -> bool {
        debug_assert_eq!(key.id_type(), self.id_type);
        let slot_id = (self.slot_id(key.hash()) as usize) % self.primary_slots.len();

        // Fast path: look for the key, or free room, along the existing
        // chain without taking the global allocator lock.
        let guard = self.primary_slots[slot_id].lock();
        if guard.entries.iter().any(|e| e.key == key) {
            return false;
        }
        if guard.entries.len() < SLOT_CAPACITY {
            let mut guard = guard;
            guard.entries.push(Entry { key, offset });
            self.entry_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return true;
        }
        let mut next_overflow = guard.overflow;
        drop(guard);
        while let Some(idx) = next_overflow {
            let overflow_slots = self.overflow_slots.lock();
            let mut ov_guard = overflow_slots[idx].lock();
            if ov_guard.entries.iter().any(|e| e.key == key) {
                return false;
            }
            if ov_guard.entries.len() < SLOT_CAPACITY {
                ov_guard.entries.push(Entry { key, offset });
                self.entry_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                return true;
            }
            next_overflow = ov_guard.overflow;
        }

        // The chain was fully saturated as of the scan above: allocate a new
        // overflow slot and link it to the chain's actual tail. Holding the
        // global allocator lock for the whole re-walk means no other thread
        // can be extending this (or any other) chain concurrently, so the
        // tail found here is authoritative; it also lets us re-check for a
        // duplicate key that a racing appender may have just linked in.
        let _alloc_guard = self.overflow_alloc.lock();

        let guard = self.primary_slots[slot_id].lock();
        if guard.entries.iter().any(|e| e.key == key) {
            return false;
        }
        debug_assert!(guard.entries.len() >= SLOT_CAPACITY);
        let mut tail_in_primary = true;
        let mut tail_idx = guard.overflow;
        drop(guard);

        while let Some(idx) = tail_idx {
            let overflow_slots = self.overflow_slots.lock();
            let ov_guard = overflow_slots[idx].lock();
            if ov_guard.entries.iter().any(|e| e.key == key) {
                return false;
            }
            debug_assert!(ov_guard.entries.len() >= SLOT_CAPACITY);
            tail_in_primary = false;
            match ov_guard.overflow {
                Some(next) => tail_idx = Some(next),
                None => break,
            }
        }

        let new_idx = {
            let mut overflow_slots = self.overflow_slots.lock();
            overflow_slots.push(Mutex::new(Slot::empty()));
            overflow_slots.len() - 1
        };
        {
            let overflow_slots = self.overflow_slots.lock();
            let mut new_guard = overflow_slots[new_idx].lock();
            new_guard.entries.push(Entry { key, offset });
        }
        if tail_in_primary {
            self.primary_slots[slot_id].lock().overflow = Some(new_idx);
        } else {
            let tail = tail_idx.expect("non-primary tail must have an index");
            self.overflow_slots.lock()[tail].lock().overflow = Some(new_idx);
        }
        self.entry_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        true
    }

    pub fn len(&self) -> u64 {
        self.entry_count.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `lookup`: walks the same slot chain `append` would use. Provided here
    /// for round-trip testing; the query engine's reader is out of scope.
    pub fn lookup(&self, key: &KeyValue) -> Option<NodeOffset> {
        let slot_id = (self.slot_id(key.hash()) as usize) % self.primary_slots.len();
        let guard = self.primary_slots[slot_id].lock();
        if let Some(e) = guard.entries.iter().find(|e| &e.key == key) {
            return Some(e.offset);
        }
        let mut next_overflow = guard.overflow;
        drop(guard);
        while let Some(idx) = next_overflow {
            let overflow_slots = self.overflow_slots.lock();
            let ov_guard = overflow_slots[idx].lock();
            if let Some(e) = ov_guard.entries.iter().find(|e| &e.key == key) {
                return Some(e.offset);
            }
            next_overflow = ov_guard.overflow;
        }
        None
    }

    /// `flush` (spec §4.D): serializes every entry, resolving string keys
    /// through `overflow`'s append-mode writer, into a flat entry list ready
    /// for on-disk layout by the catalog writer.
    pub fn flush_entries(&self, overflow: &OverflowFile) -> Vec<(InlineString, NodeOffset)> {
        let mut cursor = PageByteCursor::default();
        let mut out = Vec::with_capacity(self.len() as usize);
        for slot in &self.primary_slots {
            let guard = slot.lock();
            for e in &guard.entries {
                out.push((self.encode_key(&e.key, overflow, &mut cursor), e.offset));
            }
        }
        for slot in self.overflow_slots.lock().iter() {
            let guard = slot.lock();
            for e in &guard.entries {
                out.push((self.encode_key(&e.key, overflow, &mut cursor), e.offset));
            }
        }
        out
    }

    fn encode_key(
        &self,
        key: &KeyValue,
        overflow: &OverflowFile,
        cursor: &mut PageByteCursor,
    ) -> InlineString {
        match key {
            KeyValue::Int64(v) => InlineString {
                len: 8,
                prefix: v.to_le_bytes()[..4].try_into().unwrap(),
                tail: u64::from_le_bytes(v.to_le_bytes()),
            },
            KeyValue::Str(s) => overflow
                .copy_string(s.as_bytes(), cursor)
                .expect("string length validated at parse time"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_is_rejected() {
        let idx = PrimaryKeyIndex::bulk_reserve(IdType::Int64, 100);
        assert!(idx.append(KeyValue::Int64(1), 0));
        assert!(!idx.append(KeyValue::Int64(1), 1));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn lookup_reproduces_inserted_offset() {
        let idx = PrimaryKeyIndex::bulk_reserve(IdType::Int64, 1000);
        for i in 0..500i64 {
            assert!(idx.append(KeyValue::Int64(i), i as u64 * 2));
        }
        for i in 0..500i64 {
            assert_eq!(idx.lookup(&KeyValue::Int64(i)), Some(i as u64 * 2));
        }
        assert_eq!(idx.lookup(&KeyValue::Int64(999)), None);
    }

    #[test]
    fn string_keys_round_trip_through_overflow() {
        let idx = PrimaryKeyIndex::bulk_reserve(IdType::String, 50);
        for i in 0..50 {
            assert!(idx.append(KeyValue::Str(format!("key-{i}-with-some-extra-length")), i));
        }
        let overflow = OverflowFile::new();
        let entries = idx.flush_entries(&overflow);
        assert_eq!(entries.len(), 50);
    }

    #[test]
    fn overflow_chain_handles_more_entries_than_slot_capacity() {
        let idx = PrimaryKeyIndex::bulk_reserve(IdType::Int64, 4);
        for i in 0..(SLOT_CAPACITY as i64 * 3) {
            assert!(idx.append(KeyValue::Int64(i), i as u64));
        }
        assert_eq!(idx.len(), SLOT_CAPACITY as u64 * 3);
        for i in 0..(SLOT_CAPACITY as i64 * 3) {
            assert_eq!(idx.lookup(&KeyValue::Int64(i)), Some(i as u64));
        }
    }
}
