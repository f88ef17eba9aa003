//! Client-side state store
//!
//! The store owns a single [`RootState`] and applies actions to it through
//! the pure [`reduce`] function. Reductions are serialized by a mutex, so
//! actions are applied one at a time in the order `apply` is called, and
//! each applied action is broadcast to subscribers afterwards.
//!
//! The store performs no I/O. Request actions only record that work is in
//! flight; the [`crate::effects::Coordinator`] performs the calls and
//! applies the outcome.

pub mod actions;
pub mod events;
pub mod reducer;
pub mod selectors;
pub mod state;

pub use actions::Action;
pub use events::{StoreBus, StoreEvent, StoreReceiver};
pub use reducer::reduce;
pub use state::{
    AuthPhase, AuthState, FavoriteState, LocalReview, MoviePhase, MovieState, OpStatus,
    ReviewState, ReviewSync, RootState, Snapshot,
};

use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::trace;

use crate::config::ReviewFailurePolicy;

struct Inner {
    state: RootState,
    sequence: u64,
}

/// Context object holding the application state
///
/// Constructed once at startup and shared (behind an `Arc`) with the
/// effect coordinator and any views.
pub struct Store {
    inner: Mutex<Inner>,
    bus: StoreBus,
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(RootState::new())
    }

    pub fn with_review_policy(policy: ReviewFailurePolicy) -> Self {
        Self::with_state(RootState::with_review_policy(policy))
    }

    pub fn with_state(state: RootState) -> Self {
        Self {
            inner: Mutex::new(Inner { state, sequence: 0 }),
            bus: StoreBus::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The reducer cannot leave the state half-updated, so a poisoned
        // lock still guards a consistent value
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reduce `action` into the state and notify subscribers
    ///
    /// Returns the sequence number assigned to the action.
    pub fn apply(&self, action: Action) -> u64 {
        let event = {
            let mut inner = self.lock();
            let state = std::mem::take(&mut inner.state);
            inner.state = reduce(state, action.clone());
            inner.sequence += 1;
            trace!(sequence = inner.sequence, action = action.name(), "applied");
            StoreEvent {
                sequence: inner.sequence,
                action,
            }
        };

        let sequence = event.sequence;
        self.bus.emit(event);
        sequence
    }

    /// Clone of the current state
    pub fn state(&self) -> RootState {
        self.lock().state.clone()
    }

    /// Read a projection of the current state without cloning all of it
    pub fn select<T>(&self, f: impl FnOnce(&RootState) -> T) -> T {
        f(&self.lock().state)
    }

    /// Number of actions applied so far
    pub fn sequence(&self) -> u64 {
        self.lock().sequence
    }

    pub fn subscribe(&self) -> StoreReceiver {
        self.bus.subscribe()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
