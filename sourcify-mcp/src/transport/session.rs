//! Session store for the HTTP binding.
//!
//! Maps `mcp-session-id` values to dispatcher instances. Sessions expire
//! after an idle TTL, the least recently used one is evicted when the store
//! is full, and clients may close a session explicitly. Every removal runs
//! the teardown hook.

use crate::server::McpServer;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

/// Shortest interval between expiry sweeps.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest idle TTL; a zero TTL would expire every session on lookup.
const MIN_SESSION_TTL: Duration = Duration::from_secs(1);

/// Why a session left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Idle longer than the TTL.
    Expired,
    /// Least recently used when the store was full.
    Capacity,
    /// Closed by the client.
    Closed,
}

impl EvictionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Capacity => "capacity",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback run for every session removal.
pub type TeardownHook = Arc<dyn Fn(&str, EvictionReason) + Send + Sync>;

struct Session {
    dispatcher: Arc<McpServer>,
    created_at: Instant,
    last_seen: Instant,
}

impl Session {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.last_seen) >= ttl
    }
}

/// Session id → dispatcher map with TTL and LRU eviction.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    ttl: Duration,
    capacity: usize,
    on_teardown: TeardownHook,
}

impl SessionStore {
    /// Create a store that logs each teardown.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self::with_teardown(
            ttl,
            capacity,
            Arc::new(|session_id: &str, reason: EvictionReason| {
                info!(session_id, reason = reason.as_str(), "Session closed");
            }),
        )
    }

    /// Create a store with a custom teardown hook.
    pub fn with_teardown(ttl: Duration, capacity: usize, on_teardown: TeardownHook) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: ttl.max(MIN_SESSION_TTL),
            capacity: capacity.max(1),
            on_teardown,
        }
    }

    /// Idle TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Maximum number of live sessions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Return the dispatcher for `session_id`, creating it with `factory` if
    /// the id is unknown or its session has expired.
    ///
    /// The flag is `true` when a new dispatcher was created. Lookup and
    /// insert happen under one lock acquisition, so concurrent first
    /// requests for the same id share one dispatcher.
    pub async fn get_or_create<F>(&self, session_id: &str, factory: F) -> (Arc<McpServer>, bool)
    where
        F: FnOnce() -> Arc<McpServer>,
    {
        let now = Instant::now();
        let mut evicted = Vec::new();

        let dispatcher = {
            let mut sessions = self.sessions.lock().await;

            if let Some(session) = sessions.get_mut(session_id) {
                if !session.is_expired(now, self.ttl) {
                    session.last_seen = now;
                    return (session.dispatcher.clone(), false);
                }
                sessions.remove(session_id);
                evicted.push((session_id.to_string(), EvictionReason::Expired));
            }

            while sessions.len() >= self.capacity {
                let Some(oldest) = least_recently_used(&sessions) else {
                    break;
                };
                sessions.remove(&oldest);
                evicted.push((oldest, EvictionReason::Capacity));
            }

            let dispatcher = factory();
            sessions.insert(
                session_id.to_string(),
                Session {
                    dispatcher: dispatcher.clone(),
                    created_at: now,
                    last_seen: now,
                },
            );
            dispatcher
        };

        self.teardown(evicted);
        (dispatcher, true)
    }

    /// Close a session. Returns `false` if the id was unknown.
    pub async fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(session_id);
        match removed {
            Some(session) => {
                debug!(
                    session_id,
                    age_secs = session.created_at.elapsed().as_secs(),
                    "Closing session"
                );
                self.teardown(vec![(session_id.to_string(), EvictionReason::Closed)]);
                true
            }
            None => false,
        }
    }

    /// Remove every session idle past the TTL. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(String, EvictionReason)> = {
            let mut sessions = self.sessions.lock().await;
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, session)| session.is_expired(now, self.ttl))
                .map(|(id, _)| id.clone())
                .collect();
            for id in &ids {
                sessions.remove(id);
            }
            ids.into_iter()
                .map(|id| (id, EvictionReason::Expired))
                .collect()
        };

        let count = expired.len();
        self.teardown(expired);
        count
    }

    /// Number of live sessions, including expired ones not yet swept.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Spawn a task that sweeps expired sessions every quarter TTL.
    ///
    /// The task ends once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        let period = (self.ttl / 4).max(MIN_SWEEP_INTERVAL);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // First tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(live) = store.upgrade() else {
                    break;
                };
                let swept = live.sweep_expired().await;
                if swept > 0 {
                    debug!(swept, "Expired sessions swept");
                }
            }
        })
    }

    fn teardown(&self, evicted: Vec<(String, EvictionReason)>) {
        for (session_id, reason) in evicted {
            (self.on_teardown)(&session_id, reason);
        }
    }
}

fn least_recently_used(sessions: &HashMap<String, Session>) -> Option<String> {
    sessions
        .iter()
        .min_by_key(|(_, session)| session.last_seen)
        .map(|(id, _)| id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ServiceEndpoint, SourcifyClient};
    use std::sync::Mutex as StdMutex;

    fn dispatcher() -> Arc<McpServer> {
        let client = SourcifyClient::new(
            ServiceEndpoint::new("http://127.0.0.1:9"),
            Duration::from_secs(1),
        )
        .unwrap();
        Arc::new(McpServer::sourcify(Arc::new(client)))
    }

    fn recording_store(
        ttl: Duration,
        capacity: usize,
    ) -> (SessionStore, Arc<StdMutex<Vec<(String, EvictionReason)>>>) {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let sink = log.clone();
        let store = SessionStore::with_teardown(
            ttl,
            capacity,
            Arc::new(move |id: &str, reason: EvictionReason| {
                sink.lock().unwrap().push((id.to_string(), reason));
            }),
        );
        (store, log)
    }

    #[tokio::test]
    async fn test_same_id_reuses_dispatcher() {
        let store = SessionStore::new(Duration::from_secs(60), 8);

        let (first, created) = store.get_or_create("a", dispatcher).await;
        assert!(created);
        let (second, created) = store.get_or_create("a", dispatcher).await;
        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));

        let (other, created) = store.get_or_create("b", dispatcher).await;
        assert!(created);
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_clamped() {
        let (store, log) = recording_store(Duration::ZERO, 8);
        assert_eq!(store.ttl(), MIN_SESSION_TTL);

        let (first, _) = store.get_or_create("a", dispatcher).await;
        let (second, created) = store.get_or_create("a", dispatcher).await;

        assert!(!created);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_replaced() {
        let (store, log) = recording_store(Duration::from_secs(10), 8);

        let (first, _) = store.get_or_create("a", dispatcher).await;
        tokio::time::advance(Duration::from_secs(11)).await;
        let (second, created) = store.get_or_create("a", dispatcher).await;

        assert!(created);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(
            *log.lock().unwrap(),
            vec![("a".to_string(), EvictionReason::Expired)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_refreshes_ttl() {
        let (store, log) = recording_store(Duration::from_secs(10), 8);

        store.get_or_create("a", dispatcher).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        store.get_or_create("a", dispatcher).await;
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(store.sweep_expired().await, 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_least_recently_used() {
        let (store, log) = recording_store(Duration::from_secs(60), 2);

        store.get_or_create("a", dispatcher).await;
        tokio::time::advance(Duration::from_millis(10)).await;
        store.get_or_create("b", dispatcher).await;
        tokio::time::advance(Duration::from_millis(10)).await;
        // Touch "a" so "b" becomes the oldest.
        store.get_or_create("a", dispatcher).await;
        tokio::time::advance(Duration::from_millis(10)).await;
        store.get_or_create("c", dispatcher).await;

        assert_eq!(store.len().await, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("b".to_string(), EvictionReason::Capacity)]
        );
        let (_, created) = store.get_or_create("a", dispatcher).await;
        assert!(!created);
    }

    #[tokio::test]
    async fn test_remove_runs_teardown() {
        let (store, log) = recording_store(Duration::from_secs(60), 8);

        store.get_or_create("a", dispatcher).await;
        assert!(store.remove("a").await);
        assert!(!store.remove("a").await);
        assert!(store.is_empty().await);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("a".to_string(), EvictionReason::Closed)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_removes_idle_sessions() {
        let (store, log) = recording_store(Duration::from_secs(8), 8);
        let store = Arc::new(store);
        let sweeper = store.spawn_sweeper();

        store.get_or_create("a", dispatcher).await;
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert!(store.is_empty().await);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("a".to_string(), EvictionReason::Expired)]
        );
        sweeper.abort();
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let store = SessionStore::new(Duration::from_secs(1), 0);
        assert_eq!(store.capacity(), 1);
    }
}
