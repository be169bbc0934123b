// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

//! Bounded LRU of block headers keyed by block number.
//!
//! Entries live in a slot vector linked into a recency list by index, with a
//! map from block number to slot. Evicted slots are reused in place, so the
//! cache never allocates once full.

use std::collections::HashMap;

use parking_lot::Mutex;
use trace_data::Header;

/// Number of headers kept by default.
pub const DEFAULT_CAPACITY: usize = 90_000;

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Slot {
    header: Header,
    prev: usize,
    next: usize,
}

#[derive(Debug)]
struct Lru {
    slots: Vec<Slot>,
    index: HashMap<u64, usize>,
    /// Most recently used.
    head: usize,
    /// Least recently used.
    tail: usize,
    capacity: usize,
}

impl Lru {
    fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    fn unlink(&mut self, i: usize) {
        let (prev, next) = (self.slots[i].prev, self.slots[i].next);
        match prev {
            NIL => self.head = next,
            p => self.slots[p].next = next,
        }
        match next {
            NIL => self.tail = prev,
            n => self.slots[n].prev = prev,
        }
    }

    fn push_front(&mut self, i: usize) {
        self.slots[i].prev = NIL;
        self.slots[i].next = self.head;
        match self.head {
            NIL => self.tail = i,
            h => self.slots[h].prev = i,
        }
        self.head = i;
    }

    fn touch(&mut self, i: usize) {
        if self.head != i {
            self.unlink(i);
            self.push_front(i);
        }
    }

    fn get(&mut self, number: u64) -> Option<Header> {
        let i = *self.index.get(&number)?;
        self.touch(i);
        Some(self.slots[i].header)
    }

    fn insert(&mut self, header: Header) {
        if self.capacity == 0 {
            return;
        }
        if let Some(&i) = self.index.get(&header.number) {
            self.slots[i].header = header;
            self.touch(i);
            return;
        }

        let i = if self.slots.len() < self.capacity {
            self.slots.push(Slot {
                header,
                prev: NIL,
                next: NIL,
            });
            self.slots.len() - 1
        } else {
            let i = self.tail;
            self.unlink(i);
            self.index.remove(&self.slots[i].header.number);
            self.slots[i].header = header;
            i
        };
        self.index.insert(header.number, i);
        self.push_front(i);
    }
}

/// Thread-safe header LRU shared by concurrent requests.
#[derive(Debug)]
pub struct HeaderCache {
    inner: Mutex<Lru>,
}

impl Default for HeaderCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HeaderCache {
    /// A cache holding at most `capacity` headers. A zero capacity disables
    /// caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Lru::new(capacity)),
        }
    }

    /// Returns the cached header and marks it as most recently used.
    pub fn get(&self, number: u64) -> Option<Header> {
        self.inner.lock().get(number)
    }

    /// Inserts or refreshes a header, evicting the least recently used one
    /// when full.
    pub fn insert(&self, header: Header) {
        self.inner.lock().insert(header)
    }

    pub fn contains(&self, number: u64) -> bool {
        self.inner.lock().index.contains_key(&number)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy::primitives::B256;

    use super::*;

    fn header(number: u64) -> Header {
        Header::new(number, B256::with_last_byte(number as u8), number * 12)
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = HeaderCache::new(3);
        for n in 1..=3 {
            cache.insert(header(n));
        }
        assert_eq!(cache.len(), 3);

        // 1 becomes the most recent, 2 is now the oldest.
        assert_eq!(cache.get(1), Some(header(1)));
        cache.insert(header(4));

        assert!(!cache.contains(2));
        assert!(cache.contains(1));
        assert!(cache.contains(3));
        assert!(cache.contains(4));
        assert_eq!(cache.len(), 3);

        cache.insert(header(5));
        assert!(!cache.contains(3));
    }

    #[test]
    fn reinsert_refreshes_entry() {
        let cache = HeaderCache::new(2);
        cache.insert(header(1));
        cache.insert(header(2));

        let updated = Header::new(1, B256::repeat_byte(0xee), 99);
        cache.insert(updated);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(1), Some(updated));

        cache.insert(header(3));
        assert!(!cache.contains(2));
        assert!(cache.contains(1));
    }

    #[test]
    fn single_slot() {
        let cache = HeaderCache::new(1);
        cache.insert(header(7));
        cache.insert(header(8));
        assert_eq!(cache.get(7), None);
        assert_eq!(cache.get(8), Some(header(8)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_capacity_caches_nothing() {
        let cache = HeaderCache::new(0);
        cache.insert(header(1));
        assert!(cache.is_empty());
        assert_eq!(cache.get(1), None);
    }

    #[test]
    fn default_capacity() {
        assert_eq!(HeaderCache::default().capacity(), 90_000);
    }

    #[test]
    fn concurrent_access() {
        let cache = Arc::new(HeaderCache::new(64));
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for n in 0..1_000 {
                        let number = t * 1_000 + n;
                        cache.insert(header(number));
                        cache.get(number);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 64);
    }
}
