//! In-flight request accounting fed from `Network.*` protocol events.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
struct ActivityState {
    inflight: HashSet<String>,
    last_activity: Instant,
}

/// Point-in-time view of page network activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSnapshot {
    pub inflight: usize,
    pub since_last_activity: Duration,
}

impl NetworkSnapshot {
    /// Nothing in flight and no request started or ended within `window`.
    pub fn is_quiet(&self, window: Duration) -> bool {
        self.inflight == 0 && self.since_last_activity >= window
    }
}

/// Shared tracker; clones observe the same counters.
#[derive(Debug, Clone)]
pub struct NetworkActivity {
    state: Arc<Mutex<ActivityState>>,
}

impl Default for NetworkActivity {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkActivity {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ActivityState {
                inflight: HashSet::new(),
                last_activity: Instant::now(),
            })),
        }
    }

    /// `Network.requestWillBeSent`; redirects reuse the request id.
    pub fn request_started(&self, request_id: &str) {
        let mut state = self.state.lock();
        state.inflight.insert(request_id.to_string());
        state.last_activity = Instant::now();
    }

    /// `Network.loadingFinished` or `Network.loadingFailed`.
    pub fn request_settled(&self, request_id: &str) {
        let mut state = self.state.lock();
        state.inflight.remove(request_id);
        state.last_activity = Instant::now();
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        let state = self.state.lock();
        NetworkSnapshot {
            inflight: state.inflight.len(),
            since_last_activity: state.last_activity.elapsed(),
        }
    }
}
