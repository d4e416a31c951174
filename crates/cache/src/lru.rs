//! Generic fixed-capacity LRU store.
//!
//! Backs every in-memory cache tier. The recency order is a doubly-linked
//! list threaded through an arena of slots: `prev`/`next` are slot indices
//! rather than owning pointers, and the lookup map stores indices too, so
//! the map and the list can never disagree about which slots are live.

use std::collections::HashMap;
use std::hash::Hash;

/// Sentinel index marking the end of the recency list.
const NIL: usize = usize::MAX;

struct Slot<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

/// Fixed-capacity store with least-recently-used eviction.
///
/// Every `get` and `set` counts as a touch and moves the entry to the
/// head of the recency list; eviction always removes from the tail.
/// `get`, `set`, `remove` and tail eviction are all O(1).
///
/// Capacity is enforced synchronously after every insert, so `len()`
/// never exceeds `max_entries()` at rest.
pub struct LruStore<K, V> {
    slots: Vec<Option<Slot<K, V>>>,
    free: Vec<usize>,
    lookup: HashMap<K, usize>,
    head: usize,
    tail: usize,
    max_entries: usize,
    evictions: u64,
}

impl<K, V> LruStore<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Create a store that holds at most `max_entries` entries.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is zero. A zero-capacity cache is a
    /// programming error, not a runtime condition.
    pub fn new(max_entries: usize) -> Self {
        assert!(max_entries > 0, "LRU store capacity must be at least 1");
        Self {
            slots: Vec::with_capacity(max_entries),
            free: Vec::new(),
            lookup: HashMap::with_capacity(max_entries),
            head: NIL,
            tail: NIL,
            max_entries,
            evictions: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Total number of entries evicted over the store's lifetime.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Look up `key`, bumping the entry to most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.lookup.get(key)?;
        self.move_to_head(idx);
        self.slots[idx].as_ref().map(|slot| &slot.value)
    }

    /// Insert or update `key`, bump it to most-recently-used, then
    /// enforce capacity.
    pub fn set(&mut self, key: K, value: V) {
        if let Some(&idx) = self.lookup.get(&key) {
            let slot = self.slots[idx].as_mut().expect("live slot for mapped key");
            slot.value = value;
            self.move_to_head(idx);
        } else {
            let slot = Slot {
                key: key.clone(),
                value,
                prev: NIL,
                next: NIL,
            };
            let idx = match self.free.pop() {
                Some(idx) => {
                    self.slots[idx] = Some(slot);
                    idx
                }
                None => {
                    self.slots.push(Some(slot));
                    self.slots.len() - 1
                }
            };
            self.lookup.insert(key, idx);
            self.link_at_head(idx);
        }
        self.enforce_capacity();
    }

    /// Remove `key` if present, returning its value. No-op when absent.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.lookup.remove(key)?;
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("live slot for mapped key");
        self.free.push(idx);
        Some(slot.value)
    }

    /// Drop every entry without walking the recency list.
    pub fn remove_all(&mut self) {
        self.lookup.clear();
        self.slots.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Evict from the tail until the entry count is within capacity.
    ///
    /// `set` already calls this inline; the periodic maintenance tick
    /// calls it again as a safety net.
    pub fn enforce_capacity(&mut self) {
        while self.lookup.len() > self.max_entries {
            if !self.evict_tail() {
                break;
            }
        }
    }

    /// Evict `ceil(len * fraction)` entries from the tail end, oldest
    /// first. Returns the number of entries removed.
    ///
    /// This is the memory-pressure response: a partial clear rather than
    /// a full wipe.
    pub fn prune_fractional(&mut self, fraction: f64) -> usize {
        let len = self.lookup.len();
        if len == 0 || fraction <= 0.0 {
            return 0;
        }
        let target = (len as f64 * fraction).ceil() as usize;
        let target = target.min(len);
        let mut removed = 0;
        while removed < target && self.evict_tail() {
            removed += 1;
        }
        removed
    }

    fn evict_tail(&mut self) -> bool {
        if self.tail == NIL {
            return false;
        }
        let idx = self.tail;
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("tail slot is live");
        self.lookup.remove(&slot.key);
        self.free.push(idx);
        self.evictions += 1;
        true
    }

    fn link_at_head(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slots[idx].as_mut().expect("linking a live slot");
            slot.prev = NIL;
            slot.next = old_head;
        }
        if old_head != NIL {
            self.slots[old_head].as_mut().expect("head slot is live").prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slots[idx].as_ref().expect("unlinking a live slot");
            (slot.prev, slot.next)
        };
        if prev != NIL {
            self.slots[prev].as_mut().expect("prev slot is live").next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].as_mut().expect("next slot is live").prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn move_to_head(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.link_at_head(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_set_get() {
        let mut store = LruStore::new(4);
        store.set("a", 1);
        assert_eq!(store.get(&"a"), Some(&1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn miss_returns_none() {
        let mut store: LruStore<&str, i32> = LruStore::new(4);
        assert_eq!(store.get(&"absent"), None);
    }

    #[test]
    fn oldest_entry_is_evicted_at_capacity() {
        let mut store = LruStore::new(3);
        store.set("a", 1);
        store.set("b", 2);
        store.set("c", 3);
        store.set("d", 4);

        assert_eq!(store.len(), 3);
        assert_eq!(store.get(&"a"), None);
        assert_eq!(store.get(&"b"), Some(&2));
        assert_eq!(store.get(&"c"), Some(&3));
        assert_eq!(store.get(&"d"), Some(&4));
        assert_eq!(store.evictions(), 1);
    }

    #[test]
    fn touching_the_oldest_spares_it_from_eviction() {
        let mut store = LruStore::new(3);
        store.set("a", 1);
        store.set("b", 2);
        store.set("c", 3);

        // Bump "a" to most-recent; "b" becomes the eviction candidate.
        assert_eq!(store.get(&"a"), Some(&1));
        store.set("d", 4);

        assert_eq!(store.get(&"a"), Some(&1));
        assert_eq!(store.get(&"b"), None);
        assert_eq!(store.get(&"c"), Some(&3));
        assert_eq!(store.get(&"d"), Some(&4));
    }

    #[test]
    fn overwrite_keeps_count_and_returns_new_value() {
        let mut store = LruStore::new(3);
        store.set("a", 1);
        store.set("a", 2);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&"a"), Some(&2));
    }

    #[test]
    fn overwrite_counts_as_a_touch() {
        let mut store = LruStore::new(2);
        store.set("a", 1);
        store.set("b", 2);
        store.set("a", 10);
        store.set("c", 3);

        assert_eq!(store.get(&"b"), None);
        assert_eq!(store.get(&"a"), Some(&10));
        assert_eq!(store.get(&"c"), Some(&3));
    }

    #[test]
    fn remove_unlinks_entry() {
        let mut store = LruStore::new(3);
        store.set("a", 1);
        store.set("b", 2);

        assert_eq!(store.remove(&"a"), Some(1));
        assert_eq!(store.get(&"a"), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove(&"a"), None);
    }

    #[test]
    fn remove_all_clears_everything() {
        let mut store = LruStore::new(4);
        store.set("a", 1);
        store.set("b", 2);
        store.set("c", 3);

        store.remove_all();

        assert!(store.is_empty());
        assert_eq!(store.get(&"a"), None);
        assert_eq!(store.get(&"b"), None);
        assert_eq!(store.get(&"c"), None);

        // Still usable after a full clear.
        store.set("d", 4);
        assert_eq!(store.get(&"d"), Some(&4));
    }

    #[test]
    fn fractional_prune_removes_ceil_of_fraction_oldest_first() {
        let mut store = LruStore::new(10);
        for i in 0..8 {
            store.set(i, i);
        }

        // ceil(8 * 0.25) = 2: entries 0 and 1 are the oldest.
        let removed = store.prune_fractional(0.25);
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 6);
        assert_eq!(store.get(&0), None);
        assert_eq!(store.get(&1), None);
        assert_eq!(store.get(&2), Some(&2));
    }

    #[test]
    fn fractional_prune_on_empty_store_is_noop() {
        let mut store: LruStore<i32, i32> = LruStore::new(4);
        assert_eq!(store.prune_fractional(0.5), 0);
    }

    #[test]
    fn fractional_prune_clamps_to_len() {
        let mut store = LruStore::new(4);
        store.set(1, 1);
        store.set(2, 2);
        assert_eq!(store.prune_fractional(1.0), 2);
        assert!(store.is_empty());
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn zero_capacity_fails_fast() {
        let _ = LruStore::<i32, i32>::new(0);
    }

    #[test]
    fn count_stays_bounded_under_random_churn() {
        use rand::Rng;

        let mut rng = rand::thread_rng();
        let mut store = LruStore::new(16);
        for _ in 0..10_000 {
            let key: u32 = rng.gen_range(0..64);
            match rng.gen_range(0..3) {
                0 => {
                    let _ = store.get(&key);
                }
                1 => store.set(key, key),
                _ => {
                    let _ = store.remove(&key);
                }
            }
            assert!(store.len() <= store.max_entries());
        }
    }

    #[test]
    fn slots_are_reused_after_eviction() {
        let mut store = LruStore::new(2);
        for i in 0..100 {
            store.set(i, i);
        }
        assert_eq!(store.len(), 2);
        assert_eq!(store.evictions(), 98);
        assert_eq!(store.get(&99), Some(&99));
        assert_eq!(store.get(&98), Some(&98));
    }
}
