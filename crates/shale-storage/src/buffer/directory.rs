//! Extendible hash table used as the page directory.
//!
//! The table maps keys to values through a directory of bucket
//! references. The low `global_depth` bits of a key's hash select a
//! directory slot; every slot whose low `local_depth` bits match a
//! bucket's signature points at that bucket. An overflowing bucket is
//! split in two, doubling the directory only when the bucket's local
//! depth has caught up with the global depth, so growth never rehashes
//! the whole table.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

fn hash_of<K: Hash>(key: &K) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

struct Bucket<K, V> {
    local_depth: usize,
    entries: Vec<(K, V)>,
}

impl<K: Eq, V> Bucket<K, V> {
    fn new(local_depth: usize, capacity: usize) -> Self {
        Self {
            local_depth,
            entries: Vec::with_capacity(capacity),
        }
    }

    fn find(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn remove(&mut self, key: &K) -> bool {
        match self.entries.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                self.entries.swap_remove(pos);
                true
            }
            None => false,
        }
    }
}

struct Directory<K, V> {
    global_depth: usize,
    bucket_capacity: usize,
    num_buckets: usize,
    /// One slot per low-bit pattern; buckets are shared among slots.
    slots: Vec<Arc<RwLock<Bucket<K, V>>>>,
}

impl<K: Hash + Eq, V> Directory<K, V> {
    fn slot_of(&self, key: &K) -> usize {
        let mask = (1usize << self.global_depth) - 1;
        (hash_of(key) as usize) & mask
    }

    /// Splits the bucket referenced by directory slot `idx`.
    ///
    /// The caller has observed the bucket full; after the split the
    /// bucket's entries are partitioned between it and a fresh sibling
    /// of incremented local depth. The split can be insufficient when
    /// every entry shares the distinguishing bit; the insert loop then
    /// splits again.
    fn split(&mut self, idx: usize) {
        let bucket = Arc::clone(&self.slots[idx]);
        let mut old = bucket.write();

        if old.local_depth == self.global_depth {
            // Double the directory: slot i + 2^D starts out aliasing slot i.
            self.slots.extend_from_within(..);
            self.global_depth += 1;
        }

        old.local_depth += 1;
        let new_depth = old.local_depth;
        let high_bit = 1usize << (new_depth - 1);
        let signature = idx & (high_bit - 1);

        debug!(
            slot = idx,
            local_depth = new_depth,
            global_depth = self.global_depth,
            "splitting directory bucket"
        );

        let sibling = Arc::new(RwLock::new(Bucket::new(new_depth, self.bucket_capacity)));
        self.num_buckets += 1;

        // Rebind the half of the old bucket's referrers whose bit
        // `new_depth - 1` is set.
        let full_mask = (high_bit << 1) - 1;
        for slot in 0..self.slots.len() {
            if slot & full_mask == signature | high_bit {
                self.slots[slot] = Arc::clone(&sibling);
            }
        }

        // Partition the entries by the distinguishing bit.
        let mut sibling_guard = sibling.write();
        let entries = std::mem::take(&mut old.entries);
        for (key, value) in entries {
            if (hash_of(&key) as usize) & high_bit != 0 {
                sibling_guard.entries.push((key, value));
            } else {
                old.entries.push((key, value));
            }
        }
    }
}

/// A concurrent extendible hash table.
///
/// A single latch serializes every operation; with the table nested
/// under the buffer pool's own latch, nothing finer is needed.
///
/// # Example
///
/// ```rust
/// use shale_storage::buffer::ExtendibleHashTable;
///
/// let table: ExtendibleHashTable<u64, usize> = ExtendibleHashTable::new(4);
/// table.insert(7, 1);
/// assert_eq!(table.find(&7), Some(1));
/// assert!(table.remove(&7));
/// ```
pub struct ExtendibleHashTable<K, V> {
    inner: Mutex<Directory<K, V>>,
}

impl<K: Hash + Eq, V: Clone> ExtendibleHashTable<K, V> {
    /// Creates a table with one empty bucket of the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_capacity` is 0.
    pub fn new(bucket_capacity: usize) -> Self {
        assert!(bucket_capacity > 0, "bucket_capacity must be > 0");
        Self {
            inner: Mutex::new(Directory {
                global_depth: 0,
                bucket_capacity,
                num_buckets: 1,
                slots: vec![Arc::new(RwLock::new(Bucket::new(0, bucket_capacity)))],
            }),
        }
    }

    /// Returns the value stored under `key`, if any.
    pub fn find(&self, key: &K) -> Option<V> {
        let dir = self.inner.lock();
        let idx = dir.slot_of(key);
        let bucket = dir.slots[idx].read();
        bucket.find(key).cloned()
    }

    /// Inserts `value` under `key`, overwriting any previous value.
    ///
    /// Never fails: a full bucket is split (growing the directory when
    /// necessary) until the entry fits.
    pub fn insert(&self, key: K, value: V) {
        let mut dir = self.inner.lock();
        loop {
            let idx = dir.slot_of(&key);
            let bucket = Arc::clone(&dir.slots[idx]);
            let mut guard = bucket.write();

            if let Some((_, v)) = guard.entries.iter_mut().find(|(k, _)| *k == key) {
                *v = value;
                return;
            }
            if guard.entries.len() < dir.bucket_capacity {
                guard.entries.push((key, value));
                return;
            }

            drop(guard);
            dir.split(idx);
        }
    }

    /// Removes the entry under `key`; returns whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        let dir = self.inner.lock();
        let idx = dir.slot_of(key);
        let mut bucket = dir.slots[idx].write();
        bucket.remove(key)
    }

    /// Returns the global depth of the directory.
    pub fn global_depth(&self) -> usize {
        self.inner.lock().global_depth
    }

    /// Returns the local depth of the bucket referenced by `dir_index`.
    ///
    /// # Panics
    ///
    /// Panics if `dir_index` is outside the directory.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        self.inner.lock().slots[dir_index].read().local_depth
    }

    /// Returns the number of distinct buckets reachable from the
    /// directory.
    pub fn num_buckets(&self) -> usize {
        self.inner.lock().num_buckets
    }
}

impl<K, V> std::fmt::Debug for ExtendibleHashTable<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = self.inner.lock();
        f.debug_struct("ExtendibleHashTable")
            .field("global_depth", &dir.global_depth)
            .field("num_buckets", &dir.num_buckets)
            .field("slots", &dir.slots.len())
            .finish()
    }
}
