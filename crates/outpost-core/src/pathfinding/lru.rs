// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! A fixed-capacity, zero-allocation-after-warmup LRU cache.
//!
//! Backed by a flat array of slots linked into two doubly-linked lists (the
//! recency order and the free list) via index pairs rather than pointers or
//! boxed nodes, so `touch`/`evict` never allocate.

const NONE: u32 = u32::MAX;

struct Slot<K, V> {
    key: Option<K>,
    value: Option<V>,
    prev: u32,
    next: u32,
}

/// An LRU cache over a fixed array of `capacity` slots.
pub struct Lru<K, V> {
    slots: Vec<Slot<K, V>>,
    head: u32, // most recently used
    tail: u32, // least recently used
    free_head: u32,
    len: usize,
}

impl<K: Clone + Eq, V> Lru<K, V> {
    /// Builds an empty cache with `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        for i in 0..capacity {
            slots.push(Slot {
                key: None,
                value: None,
                prev: NONE,
                next: if i + 1 < capacity { (i + 1) as u32 } else { NONE },
            });
        }
        Self {
            slots,
            head: NONE,
            tail: NONE,
            free_head: if capacity == 0 { NONE } else { 0 },
            len: 0,
        }
    }

    /// Number of entries currently cached.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no entries are cached.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn unlink(&mut self, index: u32) {
        let (prev, next) = (self.slots[index as usize].prev, self.slots[index as usize].next);
        if prev != NONE {
            self.slots[prev as usize].next = next;
        } else {
            self.head = next;
        }
        if next != NONE {
            self.slots[next as usize].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn push_front(&mut self, index: u32) {
        self.slots[index as usize].prev = NONE;
        self.slots[index as usize].next = self.head;
        if self.head != NONE {
            self.slots[self.head as usize].prev = index;
        }
        self.head = index;
        if self.tail == NONE {
            self.tail = index;
        }
    }

    fn find_index(&self, key: &K) -> Option<u32> {
        let mut cur = self.head;
        while cur != NONE {
            if self.slots[cur as usize].key.as_ref() == Some(key) {
                return Some(cur);
            }
            cur = self.slots[cur as usize].next;
        }
        None
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let index = self.find_index(key)?;
        self.unlink(index);
        self.push_front(index);
        self.slots[index as usize].value.as_ref()
    }

    /// Looks up `key` without affecting recency order.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.find_index(key).and_then(|i| self.slots[i as usize].value.as_ref())
    }

    /// Inserts or replaces the entry for `key`, evicting the least-recently
    /// used entry if the cache is at capacity. Returns the evicted key, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<K> {
        if let Some(index) = self.find_index(&key) {
            self.slots[index as usize].value = Some(value);
            self.unlink(index);
            self.push_front(index);
            return None;
        }

        let mut evicted = None;
        let index = if self.free_head != NONE {
            let i = self.free_head;
            self.free_head = self.slots[i as usize].next;
            i
        } else {
            // Evict the tail.
            let tail = self.tail;
            debug_assert_ne!(tail, NONE, "insert on zero-capacity LRU");
            self.unlink(tail);
            evicted = self.slots[tail as usize].key.take();
            self.slots[tail as usize].value = None;
            self.len -= 1;
            tail
        };

        self.slots[index as usize].key = Some(key);
        self.slots[index as usize].value = Some(value);
        self.push_front(index);
        self.len += 1;
        evicted
    }

    /// Iterates entries in most-recently-used-first order without affecting
    /// recency.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        let mut cur = self.head;
        std::iter::from_fn(move || loop {
            if cur == NONE {
                return None;
            }
            let slot = &self.slots[cur as usize];
            cur = slot.next;
            if let (Some(k), Some(v)) = (slot.key.as_ref(), slot.value.as_ref()) {
                return Some((k, v));
            }
        })
    }

    /// Rebuilds this cache's contents from `entries`, given in
    /// most-recently-used-first order (the same order [`Lru::iter`] yields).
    /// Capacity is unchanged; used to restore a rollback snapshot without
    /// perturbing recency order.
    pub fn restore_most_recent_first(&mut self, entries: Vec<(K, V)>) {
        self.clear();
        for (key, value) in entries.into_iter().rev() {
            self.insert(key, value);
        }
    }

    /// Removes every entry, returning all slots to the free list.
    pub fn clear(&mut self) {
        let capacity = self.slots.len();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            slot.key = None;
            slot.value = None;
            slot.prev = NONE;
            slot.next = if i + 1 < capacity { (i + 1) as u32 } else { NONE };
        }
        self.head = NONE;
        self.tail = NONE;
        self.free_head = if capacity == 0 { NONE } else { 0 };
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_roundtrip() {
        let mut lru: Lru<u32, &'static str> = Lru::new(2);
        lru.insert(1, "one");
        lru.insert(2, "two");
        assert_eq!(lru.get(&1), Some(&"one"));
        assert_eq!(lru.get(&2), Some(&"two"));
    }

    #[test]
    fn eviction_drops_least_recently_used() {
        let mut lru: Lru<u32, &'static str> = Lru::new(2);
        lru.insert(1, "one");
        lru.insert(2, "two");
        // touch 1 so 2 becomes LRU
        let _ = lru.get(&1);
        let evicted = lru.insert(3, "three");
        assert_eq!(evicted, Some(2));
        assert!(lru.peek(&2).is_none());
        assert!(lru.peek(&1).is_some());
        assert!(lru.peek(&3).is_some());
    }

    #[test]
    fn iter_visits_every_entry_most_recent_first() {
        let mut lru: Lru<u32, &'static str> = Lru::new(4);
        lru.insert(1, "one");
        lru.insert(2, "two");
        lru.insert(3, "three");
        let seen: Vec<u32> = lru.iter().map(|(k, _)| *k).collect();
        assert_eq!(seen, vec![3, 2, 1]);
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut lru: Lru<u32, &'static str> = Lru::new(4);
        lru.insert(1, "one");
        lru.insert(2, "two");
        lru.clear();
        assert_eq!(lru.len(), 0);
        assert!(lru.peek(&1).is_none());
    }
}
