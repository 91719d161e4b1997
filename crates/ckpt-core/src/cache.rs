//! Bounded LRU map used by the service to cache open store handles.
//!
//! Entries live in a slab addressed by index; a doubly linked list threaded
//! through the slab tracks recency and a hash index maps keys to slots.
//! Lookup, promotion, insertion and eviction are all O(1).

use std::collections::HashMap;
use std::hash::Hash;

const SENTINEL: usize = usize::MAX;

#[derive(Clone, Copy, Debug)]
struct Link {
    prev: usize,
    next: usize,
}

impl Link {
    const DETACHED: Self = Self {
        prev: SENTINEL,
        next: SENTINEL,
    };
}

/// Least-recently-used cache with a fixed capacity.
#[derive(Debug)]
pub struct LruCache<K, V> {
    entries: Vec<Option<(K, V)>>,
    links: Vec<Link>,
    index: HashMap<K, usize>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity),
            links: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            free: Vec::new(),
            head: SENTINEL,
            tail: SENTINEL,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Look up `key`, marking it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.detach(slot);
        self.push_front(slot);
        self.entries[slot].as_ref().map(|(_, v)| v)
    }

    /// Insert or replace `key`, marking it most recently used.
    ///
    /// Returns the entry evicted to make room, if any. Replacing an existing
    /// key never evicts.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&slot) = self.index.get(&key) {
            self.entries[slot] = Some((key, value));
            self.detach(slot);
            self.push_front(slot);
            return None;
        }

        let evicted = if self.index.len() >= self.capacity {
            self.evict_tail()
        } else {
            None
        };

        let slot = match self.free.pop() {
            Some(slot) => {
                self.entries[slot] = Some((key.clone(), value));
                slot
            }
            None => {
                self.entries.push(Some((key.clone(), value)));
                self.links.push(Link::DETACHED);
                self.entries.len() - 1
            }
        };
        self.index.insert(key, slot);
        self.push_front(slot);
        evicted
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.index.remove(key)?;
        self.release(slot).map(|(_, v)| v)
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            cache: self,
            cursor: self.head,
        }
    }

    fn evict_tail(&mut self) -> Option<(K, V)> {
        let slot = self.tail;
        if slot == SENTINEL {
            return None;
        }
        let entry = self.release(slot)?;
        self.index.remove(&entry.0);
        Some(entry)
    }

    fn release(&mut self, slot: usize) -> Option<(K, V)> {
        self.detach(slot);
        self.free.push(slot);
        self.entries[slot].take()
    }

    fn detach(&mut self, slot: usize) {
        let Link { prev, next } = self.links[slot];
        if prev == SENTINEL {
            self.head = next;
        } else {
            self.links[prev].next = next;
        }
        if next == SENTINEL {
            self.tail = prev;
        } else {
            self.links[next].prev = prev;
        }
        self.links[slot] = Link::DETACHED;
    }

    fn push_front(&mut self, slot: usize) {
        self.links[slot] = Link {
            prev: SENTINEL,
            next: self.head,
        };
        if self.head != SENTINEL {
            self.links[self.head].prev = slot;
        }
        self.head = slot;
        if self.tail == SENTINEL {
            self.tail = slot;
        }
    }
}

/// Iterator returned by [`LruCache::keys`].
pub struct Keys<'a, K, V> {
    cache: &'a LruCache<K, V>,
    cursor: usize,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == SENTINEL {
            return None;
        }
        let slot = self.cursor;
        self.cursor = self.cache.links[slot].next;
        self.cache.entries[slot].as_ref().map(|(k, _)| k)
    }
}
