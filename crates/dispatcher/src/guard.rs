//! IdempotencyGuard - ids that were already delivered
//!
//! Append-only for the lifetime of the dispatcher. Concurrent sends of the same
//! id are serialized through [`IdempotencyGuard::claim`].

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

#[derive(Debug, Default)]
struct GuardState {
    sent: HashSet<String>,
    in_flight: HashSet<String>,
}

/// Set of successfully delivered email ids
#[derive(Debug, Default)]
pub struct IdempotencyGuard {
    state: Mutex<GuardState>,
}

/// Result of [`IdempotencyGuard::claim`]
#[derive(Debug)]
pub enum Claim<'a> {
    /// The id was delivered earlier
    AlreadySent,
    /// Another caller holds the claim for this id
    InFlight,
    /// The caller now owns the id until the guard is committed or dropped
    Acquired(ClaimGuard<'a>),
}

impl IdempotencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership check
    pub fn has_sent(&self, id: &str) -> bool {
        self.lock().sent.contains(id)
    }

    /// Record a delivered id; marking twice is a no-op
    pub fn mark_sent(&self, id: &str) {
        self.lock().sent.insert(id.to_string());
    }

    /// Number of delivered ids
    pub fn len(&self) -> usize {
        self.lock().sent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically check the id and reserve it for the caller
    pub fn claim(&self, id: &str) -> Claim<'_> {
        let mut state = self.lock();
        if state.sent.contains(id) {
            return Claim::AlreadySent;
        }
        if !state.in_flight.insert(id.to_string()) {
            return Claim::InFlight;
        }
        Claim::Acquired(ClaimGuard {
            guard: self,
            id: id.to_string(),
            committed: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive reservation of an id while its send is running
///
/// Dropping without [`commit`](Self::commit) releases the id so a later send
/// may try again.
#[derive(Debug)]
pub struct ClaimGuard<'a> {
    guard: &'a IdempotencyGuard,
    id: String,
    committed: bool,
}

impl ClaimGuard<'_> {
    /// Move the id from in-flight to sent
    pub fn commit(mut self) {
        let mut state = self.guard.lock();
        state.in_flight.remove(&self.id);
        state.sent.insert(self.id.clone());
        self.committed = true;
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.guard.lock().in_flight.remove(&self.id);
            debug!(email_id = %self.id, "Released idempotency claim");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_sent_is_idempotent() {
        let guard = IdempotencyGuard::new();
        assert!(!guard.has_sent("a"));

        guard.mark_sent("a");
        guard.mark_sent("a");

        assert!(guard.has_sent("a"));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_claim_commit() {
        let guard = IdempotencyGuard::new();

        let Claim::Acquired(claim) = guard.claim("a") else {
            panic!("expected fresh claim");
        };
        assert!(matches!(guard.claim("a"), Claim::InFlight));

        claim.commit();
        assert!(guard.has_sent("a"));
        assert!(matches!(guard.claim("a"), Claim::AlreadySent));
    }

    #[test]
    fn test_claim_released_on_drop() {
        let guard = IdempotencyGuard::new();

        match guard.claim("a") {
            Claim::Acquired(claim) => drop(claim),
            other => panic!("unexpected {:?}", other),
        }

        assert!(!guard.has_sent("a"));
        assert!(matches!(guard.claim("a"), Claim::Acquired(_)));
    }

    #[test]
    fn test_claims_are_per_id() {
        let guard = IdempotencyGuard::new();
        let _a = guard.claim("a");
        assert!(matches!(guard.claim("b"), Claim::Acquired(_)));
    }
}
