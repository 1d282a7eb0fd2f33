//! Frame replacement policies.
//!
//! [`LruKReplacer`] is the policy the buffer pool runs on: it evicts the
//! evictable frame with the greatest backward K-distance, falling back
//! to classic LRU order among frames with fewer than K recorded
//! accesses. [`LruReplacer`] is an interface-compatible plain-LRU
//! alternative kept for testing.
//!
//! Both replacers guard their whole state with a single latch; the
//! buffer pool only invokes them while already holding its own latch.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use shale_common::types::FrameId;
use tracing::debug;

/// A frame replacement policy.
///
/// Frames move through `untracked -> tracked(non-evictable) <->
/// tracked(evictable) -> evicted`; only evictable frames are candidates
/// for [`evict`](Replacer::evict).
///
/// Passing an out-of-range frame id, toggling an untracked frame, or
/// removing a non-evictable frame are caller bugs and panic.
pub trait Replacer: Send + Sync {
    /// Records an access to `frame_id`, tracking it if it was not
    /// already tracked. Newly tracked frames start out non-evictable.
    fn record_access(&self, frame_id: FrameId);

    /// Marks `frame_id` evictable or not.
    fn set_evictable(&self, frame_id: FrameId, evictable: bool);

    /// Selects a victim among the evictable frames, removes its entry,
    /// and returns it. Returns `None` when no frame is evictable.
    fn evict(&self) -> Option<FrameId>;

    /// Stops tracking `frame_id` without electing it through the
    /// policy. Untracked frames are ignored.
    fn remove(&self, frame_id: FrameId);

    /// Returns the number of evictable frames.
    fn size(&self) -> usize;
}

// ---------------------------------------------------------------------------
// LRU-K
// ---------------------------------------------------------------------------

struct AccessHistory {
    /// The last K access timestamps, oldest first.
    timestamps: VecDeque<u64>,
    evictable: bool,
}

struct LruKState {
    entries: HashMap<FrameId, AccessHistory>,
    /// Logical clock, incremented on every recorded access. At one
    /// access per nanosecond a u64 lasts ~584 years, so wraparound is
    /// not handled.
    current_timestamp: u64,
    evictable_count: usize,
}

/// LRU-K replacement policy.
///
/// The backward K-distance of a frame is the time since its K-th most
/// recent access, or +infinity when fewer than K accesses have been
/// recorded. The victim is the evictable frame with the greatest
/// distance; frames at +infinity are ordered among themselves by their
/// first recorded access, oldest first.
///
/// Compared to plain LRU this keeps a page touched once by a scan from
/// displacing pages with an established re-reference history.
pub struct LruKReplacer {
    replacer_size: usize,
    k: usize,
    inner: Mutex<LruKState>,
}

impl LruKReplacer {
    /// Creates a replacer tracking frames in `[0, replacer_size)`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is 0.
    pub fn new(replacer_size: usize, k: usize) -> Self {
        assert!(k > 0, "k must be > 0");
        Self {
            replacer_size,
            k,
            inner: Mutex::new(LruKState {
                entries: HashMap::with_capacity(replacer_size),
                current_timestamp: 0,
                evictable_count: 0,
            }),
        }
    }

    /// Returns K.
    pub fn k(&self) -> usize {
        self.k
    }

    fn check_range(&self, frame_id: FrameId) {
        assert!(
            frame_id.index() < self.replacer_size,
            "frame {frame_id} out of range for replacer of size {}",
            self.replacer_size
        );
    }
}

impl Replacer for LruKReplacer {
    fn record_access(&self, frame_id: FrameId) {
        self.check_range(frame_id);
        let mut state = self.inner.lock();
        let now = state.current_timestamp;
        state.current_timestamp += 1;

        let entry = state.entries.entry(frame_id).or_insert_with(|| AccessHistory {
            timestamps: VecDeque::with_capacity(self.k),
            evictable: false,
        });
        entry.timestamps.push_back(now);
        if entry.timestamps.len() > self.k {
            entry.timestamps.pop_front();
        }
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        self.check_range(frame_id);
        let mut state = self.inner.lock();
        let entry = match state.entries.get_mut(&frame_id) {
            Some(entry) => entry,
            None => panic!("set_evictable on untracked frame {frame_id}"),
        };
        let changed = entry.evictable != evictable;
        entry.evictable = evictable;
        if changed {
            if evictable {
                state.evictable_count += 1;
            } else {
                state.evictable_count -= 1;
            }
        }
    }

    fn evict(&self) -> Option<FrameId> {
        let mut state = self.inner.lock();

        // (frame, has fewer than K accesses, K-th most recent timestamp).
        // With histories capped at K the front is the K-th most recent
        // access, so the greatest backward distance is the smallest
        // front; +infinity candidates order by first access the same way.
        let mut victim: Option<(FrameId, bool, u64)> = None;
        for (&frame_id, entry) in &state.entries {
            if !entry.evictable {
                continue;
            }
            let infinite = entry.timestamps.len() < self.k;
            let ts = *entry
                .timestamps
                .front()
                .expect("tracked frame has at least one access");
            let better = match victim {
                None => true,
                Some((_, vic_infinite, vic_ts)) => match (infinite, vic_infinite) {
                    (true, false) => true,
                    (false, true) => false,
                    _ => ts < vic_ts,
                },
            };
            if better {
                victim = Some((frame_id, infinite, ts));
            }
        }

        let (frame_id, _, _) = victim?;
        state.entries.remove(&frame_id);
        state.evictable_count -= 1;
        debug!(frame = frame_id.index(), "lru-k evicting frame");
        Some(frame_id)
    }

    fn remove(&self, frame_id: FrameId) {
        let mut state = self.inner.lock();
        let evictable = match state.entries.get(&frame_id) {
            None => return,
            Some(entry) => entry.evictable,
        };
        assert!(
            evictable,
            "cannot remove frame {frame_id} while it is not evictable"
        );
        state.entries.remove(&frame_id);
        state.evictable_count -= 1;
    }

    fn size(&self) -> usize {
        self.inner.lock().evictable_count
    }
}

impl std::fmt::Debug for LruKReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("LruKReplacer")
            .field("replacer_size", &self.replacer_size)
            .field("k", &self.k)
            .field("tracked", &state.entries.len())
            .field("evictable", &state.evictable_count)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Plain LRU
// ---------------------------------------------------------------------------

struct LruNode {
    frame_id: FrameId,
    /// Arena index of the next-newer node.
    prev: Option<usize>,
    /// Arena index of the next-older node.
    next: Option<usize>,
    evictable: bool,
}

struct LruState {
    map: HashMap<FrameId, usize>,
    nodes: Vec<LruNode>,
    free_slots: Vec<usize>,
    /// Most recently accessed.
    head: Option<usize>,
    /// Least recently accessed.
    tail: Option<usize>,
    evictable_count: usize,
}

impl LruState {
    fn unlink(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);
        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
        self.nodes[slot].prev = None;
        self.nodes[slot].next = None;
    }

    fn push_front(&mut self, slot: usize) {
        self.nodes[slot].prev = None;
        self.nodes[slot].next = self.head;
        if let Some(h) = self.head {
            self.nodes[h].prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }

    fn alloc(&mut self, frame_id: FrameId) -> usize {
        let node = LruNode {
            frame_id,
            prev: None,
            next: None,
            evictable: false,
        };
        match self.free_slots.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, slot: usize) {
        self.unlink(slot);
        let frame_id = self.nodes[slot].frame_id;
        self.map.remove(&frame_id);
        self.free_slots.push(slot);
    }
}

/// Plain LRU replacement policy.
///
/// The recency list is an arena of nodes addressed by index with a
/// `frame -> slot` map on the side, giving O(1) touch and unlink
/// without raw-pointer links.
pub struct LruReplacer {
    replacer_size: usize,
    inner: Mutex<LruState>,
}

impl LruReplacer {
    /// Creates a replacer tracking frames in `[0, replacer_size)`.
    pub fn new(replacer_size: usize) -> Self {
        Self {
            replacer_size,
            inner: Mutex::new(LruState {
                map: HashMap::with_capacity(replacer_size),
                nodes: Vec::with_capacity(replacer_size),
                free_slots: Vec::new(),
                head: None,
                tail: None,
                evictable_count: 0,
            }),
        }
    }

    fn check_range(&self, frame_id: FrameId) {
        assert!(
            frame_id.index() < self.replacer_size,
            "frame {frame_id} out of range for replacer of size {}",
            self.replacer_size
        );
    }
}

impl Replacer for LruReplacer {
    fn record_access(&self, frame_id: FrameId) {
        self.check_range(frame_id);
        let mut state = self.inner.lock();
        match state.map.get(&frame_id).copied() {
            Some(slot) => {
                state.unlink(slot);
                state.push_front(slot);
            }
            None => {
                let slot = state.alloc(frame_id);
                state.map.insert(frame_id, slot);
                state.push_front(slot);
            }
        }
    }

    fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        self.check_range(frame_id);
        let mut state = self.inner.lock();
        let slot = match state.map.get(&frame_id).copied() {
            Some(slot) => slot,
            None => panic!("set_evictable on untracked frame {frame_id}"),
        };
        let changed = state.nodes[slot].evictable != evictable;
        state.nodes[slot].evictable = evictable;
        if changed {
            if evictable {
                state.evictable_count += 1;
            } else {
                state.evictable_count -= 1;
            }
        }
    }

    fn evict(&self) -> Option<FrameId> {
        let mut state = self.inner.lock();
        let mut cursor = state.tail;
        while let Some(slot) = cursor {
            if state.nodes[slot].evictable {
                let frame_id = state.nodes[slot].frame_id;
                state.release(slot);
                state.evictable_count -= 1;
                debug!(frame = frame_id.index(), "lru evicting frame");
                return Some(frame_id);
            }
            cursor = state.nodes[slot].prev;
        }
        None
    }

    fn remove(&self, frame_id: FrameId) {
        let mut state = self.inner.lock();
        let slot = match state.map.get(&frame_id).copied() {
            Some(slot) => slot,
            None => return,
        };
        assert!(
            state.nodes[slot].evictable,
            "cannot remove frame {frame_id} while it is not evictable"
        );
        state.release(slot);
        state.evictable_count -= 1;
    }

    fn size(&self) -> usize {
        self.inner.lock().evictable_count
    }
}

impl std::fmt::Debug for LruReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("LruReplacer")
            .field("replacer_size", &self.replacer_size)
            .field("tracked", &state.map.len())
            .field("evictable", &state.evictable_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fid(id: usize) -> FrameId {
        FrameId::new(id)
    }

    fn make_evictable(replacer: &dyn Replacer, frames: &[usize]) {
        for &f in frames {
            replacer.set_evictable(fid(f), true);
        }
    }

    #[test]
    fn test_lruk_backward_k_distance_order() {
        let replacer = LruKReplacer::new(3, 2);

        // Access sequence F1, F2, F3, F1, F2, F1.
        for f in [1, 2, 0, 1, 2, 1] {
            // use 0 for F3 so ids stay in range of a 3-frame pool
            replacer.record_access(fid(f));
        }
        make_evictable(&replacer, &[0, 1, 2]);
        assert_eq!(replacer.size(), 3);

        // F3 (id 0) has a single access: +infinity distance, evicted first.
        assert_eq!(replacer.evict(), Some(fid(0)));
        // Among the full histories F2's 2nd-most-recent access is older.
        assert_eq!(replacer.evict(), Some(fid(2)));
        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.evict(), None);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_lruk_infinite_tiebreak_by_first_access() {
        let replacer = LruKReplacer::new(4, 2);

        replacer.record_access(fid(3));
        replacer.record_access(fid(1));
        make_evictable(&replacer, &[1, 3]);

        // Both below K accesses; the earliest first access goes first.
        assert_eq!(replacer.evict(), Some(fid(3)));
        assert_eq!(replacer.evict(), Some(fid(1)));
    }

    #[test]
    fn test_lruk_infinite_precedes_finite() {
        let replacer = LruKReplacer::new(2, 2);

        replacer.record_access(fid(0));
        replacer.record_access(fid(0)); // full history, finite distance
        replacer.record_access(fid(1)); // single access, +infinity
        make_evictable(&replacer, &[0, 1]);

        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.evict(), Some(fid(0)));
    }

    #[test]
    fn test_lruk_history_capped_at_k() {
        let replacer = LruKReplacer::new(2, 2);

        // f0: accesses at t0, t1, t4 -> 2nd most recent is t1.
        // f1: accesses at t2, t3    -> 2nd most recent is t2.
        replacer.record_access(fid(0));
        replacer.record_access(fid(0));
        replacer.record_access(fid(1));
        replacer.record_access(fid(1));
        replacer.record_access(fid(0));
        make_evictable(&replacer, &[0, 1]);

        assert_eq!(replacer.evict(), Some(fid(0)));
    }

    #[test]
    fn test_lruk_evict_skips_non_evictable() {
        let replacer = LruKReplacer::new(2, 2);

        replacer.record_access(fid(0));
        replacer.record_access(fid(1));
        replacer.set_evictable(fid(1), true);

        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lruk_set_evictable_adjusts_size() {
        let replacer = LruKReplacer::new(2, 2);

        replacer.record_access(fid(0));
        assert_eq!(replacer.size(), 0);

        replacer.set_evictable(fid(0), true);
        assert_eq!(replacer.size(), 1);

        // Idempotent toggles do not drift the count.
        replacer.set_evictable(fid(0), true);
        assert_eq!(replacer.size(), 1);

        replacer.set_evictable(fid(0), false);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_lruk_eviction_clears_history() {
        let replacer = LruKReplacer::new(2, 2);

        replacer.record_access(fid(0));
        replacer.record_access(fid(0));
        replacer.set_evictable(fid(0), true);
        assert_eq!(replacer.evict(), Some(fid(0)));

        // Re-tracking starts from an empty history: +infinity again.
        replacer.record_access(fid(0));
        replacer.record_access(fid(1));
        replacer.record_access(fid(1));
        make_evictable(&replacer, &[0, 1]);
        assert_eq!(replacer.evict(), Some(fid(0)));
    }

    #[test]
    fn test_lruk_remove() {
        let replacer = LruKReplacer::new(2, 2);

        replacer.record_access(fid(0));
        replacer.set_evictable(fid(0), true);
        replacer.remove(fid(0));
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);

        // Untracked frames are ignored.
        replacer.remove(fid(1));
    }

    #[test]
    #[should_panic(expected = "not evictable")]
    fn test_lruk_remove_non_evictable_panics() {
        let replacer = LruKReplacer::new(2, 2);
        replacer.record_access(fid(0));
        replacer.remove(fid(0));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_lruk_out_of_range_panics() {
        let replacer = LruKReplacer::new(2, 2);
        replacer.record_access(fid(2));
    }

    #[test]
    #[should_panic(expected = "untracked")]
    fn test_lruk_set_evictable_untracked_panics() {
        let replacer = LruKReplacer::new(2, 2);
        replacer.set_evictable(fid(0), true);
    }

    #[test]
    fn test_lru_evicts_least_recently_used() {
        let replacer = LruReplacer::new(3);

        for f in [0, 1, 2] {
            replacer.record_access(fid(f));
        }
        make_evictable(&replacer, &[0, 1, 2]);

        assert_eq!(replacer.evict(), Some(fid(0)));
        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.evict(), Some(fid(2)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_lru_touch_moves_to_front() {
        let replacer = LruReplacer::new(3);

        for f in [0, 1, 2] {
            replacer.record_access(fid(f));
        }
        replacer.record_access(fid(0));
        make_evictable(&replacer, &[0, 1, 2]);

        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.evict(), Some(fid(2)));
        assert_eq!(replacer.evict(), Some(fid(0)));
    }

    #[test]
    fn test_lru_evict_skips_non_evictable() {
        let replacer = LruReplacer::new(3);

        for f in [0, 1, 2] {
            replacer.record_access(fid(f));
        }
        make_evictable(&replacer, &[1, 2]);

        // Frame 0 is oldest but pinned; frame 1 goes first.
        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.evict(), Some(fid(2)));
        assert_eq!(replacer.evict(), None);
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_lru_arena_reuses_slots() {
        let replacer = LruReplacer::new(2);

        replacer.record_access(fid(0));
        replacer.set_evictable(fid(0), true);
        assert_eq!(replacer.evict(), Some(fid(0)));

        // The freed arena slot is recycled for the next frame.
        replacer.record_access(fid(1));
        replacer.set_evictable(fid(1), true);
        assert_eq!(replacer.evict(), Some(fid(1)));
        assert_eq!(replacer.inner.lock().nodes.len(), 1);
    }

    #[test]
    #[should_panic(expected = "not evictable")]
    fn test_lru_remove_non_evictable_panics() {
        let replacer = LruReplacer::new(2);
        replacer.record_access(fid(0));
        replacer.remove(fid(0));
    }

    #[test]
    fn test_replacers_share_interface() {
        let replacers: Vec<Box<dyn Replacer>> =
            vec![Box::new(LruKReplacer::new(2, 2)), Box::new(LruReplacer::new(2))];

        for replacer in &replacers {
            replacer.record_access(fid(0));
            replacer.record_access(fid(1));
            replacer.set_evictable(fid(0), true);
            replacer.set_evictable(fid(1), true);

            // With one access each, LRU-K order matches plain LRU.
            assert_eq!(replacer.evict(), Some(fid(0)));
            assert_eq!(replacer.evict(), Some(fid(1)));
        }
    }
}
