//! Holder of the singleton [`LiveSession`].

use chrono::Utc;
use metrics::gauge;
use parking_lot::RwLock;
use podium_core::LiveSession;

/// Owns the current live-session value.
///
/// Readers get a cloned snapshot under a short read lock. Writers build the
/// next value off to the side and swap it in, so a snapshot never shows a
/// half-applied mutation. Writes are crate-private: only the command
/// processor mutates the session.
#[derive(Debug, Default)]
pub struct LiveSessionStore {
    state: RwLock<LiveSession>,
}

impl LiveSessionStore {
    /// Store holding a fresh INACTIVE session at version 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session value.
    pub fn snapshot(&self) -> LiveSession {
        self.state.read().clone()
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Apply `mutate`, bump the version and timestamp, and return the result.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn commit(&self, mutate: impl FnOnce(&mut LiveSession)) -> LiveSession {
        let mut state = self.state.write();
        let mut next = state.clone();
        mutate(&mut next);
        next.version = state.version + 1;
        next.updated_at = Utc::now();
        *state = next.clone();
        drop(state);
        gauge!("live_session_version").set(next.version as f64);
        next
    }
}
