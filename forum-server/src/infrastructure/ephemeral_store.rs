//! In-memory keyed store whose entries expire.
//!
//! Expiry is enforced on every read: an entry whose deadline has passed is reported
//! as absent even if it is still physically present. [`EphemeralStore::purge_expired`]
//! and [`spawn_sweeper`] only reclaim memory for keys nobody reads again.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tracing::debug;

pub(crate) trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

impl<V> Entry<V> {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Result of [`EphemeralStore::consume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConsumeOutcome<V> {
    /// The entry matched and has been removed.
    Consumed(V),
    /// Live entry present but the predicate rejected it; it is left in place.
    Rejected,
    /// No entry, or only an expired one.
    Absent,
}

pub(crate) struct EphemeralStore<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    clock: Arc<dyn Clock>,
}

impl<V> std::fmt::Debug for EphemeralStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralStore")
            .field("entries", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl<V: Clone> Default for EphemeralStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> EphemeralStore<V> {
    pub(crate) fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub(crate) fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// `now + ttl`, saturating at the latest representable instant.
    pub(crate) fn deadline(&self, ttl: Duration) -> DateTime<Utc> {
        self.now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Installs `value` for `ttl`, replacing whatever was stored under `key`.
    pub(crate) fn set(&self, key: impl Into<String>, value: V, ttl: Duration) -> DateTime<Utc> {
        let expires_at = self.deadline(ttl);
        self.set_until(key, value, expires_at);
        expires_at
    }

    pub(crate) fn set_until(&self, key: impl Into<String>, value: V, expires_at: DateTime<Utc>) {
        self.lock().insert(key.into(), Entry { value, expires_at });
    }

    pub(crate) fn get(&self, key: &str) -> Option<V> {
        let now = self.now();
        let mut entries = self.lock();
        if let Some(entry) = entries.get(key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Atomically removes and returns the live entry under `key` if `predicate` accepts it.
    /// Success is [`ConsumeOutcome::Consumed`]; a rejected entry is left in place.
    pub(crate) fn consume<F>(&self, key: &str, predicate: F) -> ConsumeOutcome<V>
    where
        F: FnOnce(&V) -> bool,
    {
        let now = self.now();
        let mut entries = self.lock();
        let Some(entry) = entries.get(key) else {
            return ConsumeOutcome::Absent;
        };
        if !entry.is_live(now) {
            entries.remove(key);
            return ConsumeOutcome::Absent;
        }
        if !predicate(&entry.value) {
            return ConsumeOutcome::Rejected;
        }
        match entries.remove(key) {
            Some(entry) => ConsumeOutcome::Consumed(entry.value),
            None => ConsumeOutcome::Absent,
        }
    }

    pub(crate) fn delete(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Drops every expired entry and returns how many were removed.
    pub(crate) fn purge_expired(&self) -> usize {
        let now = self.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }

    /// Physically stored entries, expired ones included.
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}

impl<V> EphemeralStore<V> {
    // Every critical section leaves the map consistent, so a poisoned guard is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Periodically purges expired entries from `store` until the task is aborted.
pub(crate) fn spawn_sweeper<V>(
    name: &'static str,
    store: Arc<EphemeralStore<V>>,
    every: std::time::Duration,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!(store = name, purged, remaining = store.len(), "purged expired entries");
            }
        }
    })
}
