//! BackendPool - ordered backends with a shared rotation cursor

use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed, ordered list of backends
///
/// The cursor is the only mutable state and only rotation moves it.
#[derive(Debug)]
pub struct BackendPool<B> {
    backends: Vec<B>,
    cursor: AtomicUsize,
}

impl<B> BackendPool<B> {
    /// Create a pool; returns None if `backends` is empty
    pub fn new(backends: Vec<B>) -> Option<Self> {
        if backends.is_empty() {
            return None;
        }
        Some(Self {
            backends,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// Index of the current backend
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Backend at the cursor
    pub fn current(&self) -> &B {
        &self.backends[self.cursor()]
    }

    /// Backend at `index` (wrapped)
    pub fn get(&self, index: usize) -> &B {
        &self.backends[index % self.backends.len()]
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.backends.len()
    }

    /// cursor = (cursor + 1) mod len; returns the new cursor
    pub fn advance(&self) -> usize {
        let len = self.backends.len();
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
            .unwrap_or_else(|c| c);
        (previous + 1) % len
    }

    /// Rotate away from `observed`
    ///
    /// Only moves the cursor if it still points at `observed`, so concurrent
    /// callers leaving the same backend advance it once. Returns the index the
    /// caller should use next, which is always `observed + 1`.
    pub fn advance_from(&self, observed: usize) -> usize {
        let next = self.next_index(observed);
        let _ = self
            .cursor
            .compare_exchange(observed, next, Ordering::AcqRel, Ordering::Acquire);
        next
    }
}
