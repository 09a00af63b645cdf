//! Keyed trailing-edge debouncing with injected time.
//!
//! Each key holds at most one pending value. Scheduling again replaces the
//! value and pushes the deadline out by the window, so a burst produces one
//! write carrying the last value. Nothing here sleeps: callers pass `now`
//! and collect due entries with [`Debouncer::take_due`].

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use web_time::Instant;

#[derive(Debug, Clone)]
struct Pending<V> {
    value: V,
    deadline: Instant,
}

#[derive(Debug, Clone)]
pub struct Debouncer<K, V> {
    window: Duration,
    pending: HashMap<K, Pending<V>>,
}

impl<K: Eq + Hash + Clone, V> Debouncer<K, V> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `value` for `key`. Returns true when it superseded a pending
    /// value.
    pub fn schedule(&mut self, key: K, value: V, now: Instant) -> bool {
        let deadline = now + self.window;
        self.pending
            .insert(key, Pending { value, deadline })
            .is_some()
    }

    /// Drop the pending value for `key`.
    pub fn cancel(&mut self, key: &K) -> Option<V> {
        self.pending.remove(key).map(|p| p.value)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Remove and return entries whose window has elapsed, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, V)> {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();
        self.drain_keys(due)
    }

    /// Remove and return everything, earliest deadline first.
    pub fn take_all(&mut self) -> Vec<(K, V)> {
        let keys: Vec<K> = self.pending.keys().cloned().collect();
        self.drain_keys(keys)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn drain_keys(&mut self, keys: Vec<K>) -> Vec<(K, V)> {
        let mut out: Vec<(K, Pending<V>)> = keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (k, p)))
            .collect();
        out.sort_by_key(|(_, p)| p.deadline);
        out.into_iter().map(|(k, p)| (k, p.value)).collect()
    }
}
