// Copyright 2018 Kodebox, Inc.
// This file is part of CodeChain.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::hash::Hash as StdHash;

use lru_cache::LruCache;
use parking_lot::Mutex;

use super::types::{BlockNumber, CACHE_HEAD_WINDOW, CACHE_SIZE};

/// Whether a level/header/block at `number` is worth caching, given the
/// current `Head` height (`None` before any block has been promoted).
///
/// The cache only ever holds entries "near the head": the genesis block,
/// everything within `CACHE_HEAD_WINDOW` blocks behind `Head`, and the one
/// block immediately ahead of it (the usual position of `BestSuggested`).
pub fn should_cache(number: BlockNumber, head: Option<BlockNumber>) -> bool {
    if number == 0 {
        return true
    }
    let head = match head {
        None => return true,
        Some(head) => head,
    };
    let lower_bound_exclusive = head.saturating_sub(CACHE_HEAD_WINDOW);
    number > lower_bound_exclusive && number <= head + 1
}

/// A bounded, thread-safe LRU. Advisory only: the key–value store underneath
/// is ground truth and a miss here is never an error, only a slower path.
pub struct Cache<K, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: StdHash + Eq, V: Clone> Cache<K, V> {
    pub fn new() -> Self {
        Cache {
            inner: Mutex::new(LruCache::new(CACHE_SIZE)),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get_mut(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.lock().insert(key, value);
    }

    pub fn remove(&self, key: &K) {
        self.inner.lock().remove(key);
    }
}

impl<K: StdHash + Eq, V: Clone> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_always_cacheable() {
        assert!(should_cache(0, None));
        assert!(should_cache(0, Some(1_000)));
    }

    #[test]
    fn nothing_is_excluded_before_a_head_exists() {
        assert!(should_cache(500, None));
    }

    #[test]
    fn window_around_the_head_is_cacheable() {
        let head = Some(100);
        assert!(should_cache(37, head));
        assert!(!should_cache(36, head));
        assert!(should_cache(100, head));
        assert!(should_cache(101, head));
        assert!(!should_cache(102, head));
    }

    #[test]
    fn cache_evicts_past_capacity() {
        let cache: Cache<u64, u64> = Cache::new();
        for i in 0..(CACHE_SIZE as u64 + 10) {
            cache.insert(i, i);
        }
        assert_eq!(cache.get(&0), None);
        assert_eq!(cache.get(&(CACHE_SIZE as u64 + 9)), Some(CACHE_SIZE as u64 + 9));
    }
}
