//! Bounded in-memory result cache keyed by exact headline text.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::SentimentResult;

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Thread-safe cache; evicts the oldest inserted key once `cap` is exceeded.
/// Re-inserting an existing key replaces the value (last writer wins) and
/// keeps its original position.
#[derive(Debug)]
pub struct SentimentCache {
    inner: Mutex<Inner>,
    cap: usize,
}

#[derive(Debug, Default)]
struct Inner {
    map: HashMap<String, SentimentResult>,
    order: VecDeque<String>,
}

impl SentimentCache {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::with_capacity(cap.min(4096)),
                order: VecDeque::with_capacity(cap.min(4096)),
            }),
            cap,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    pub fn get(&self, key: &str) -> Option<SentimentResult> {
        self.lock().map.get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: SentimentResult) {
        let mut g = self.lock();
        if g.map.insert(key.to_string(), value).is_some() {
            return;
        }
        g.order.push_back(key.to_string());
        while g.order.len() > self.cap {
            if let Some(oldest) = g.order.pop_front() {
                g.map.remove(&oldest);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }
}

impl Default for SentimentCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}
