use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::SessionId;
use crate::utils::Clock;

/// Per-client key/value session storage.
///
/// Values are opaque strings; typed data is (de)serialized by the caller.
pub trait SessionStore: Send + Sync {
    fn get(&self, session: &SessionId, key: &str) -> Option<String>;
    fn set(&self, session: &SessionId, key: &str, value: String);
    fn remove(&self, session: &SessionId, key: &str) -> Option<String>;
    /// Keep the session alive at least until `until`; never shortens it
    fn renew(&self, session: &SessionId, until: DateTime<Utc>);
}

#[derive(Debug, Clone)]
struct StoredSession {
    values: HashMap<String, String>,
    expires_at: DateTime<Utc>,
}

/// Thread-safe in-memory session store with an absolute session lifetime.
/// Expired sessions are dropped lazily on access or by `cleanup_expired`.
#[derive(Clone)]
pub struct InMemorySessionStore {
    storage: Arc<DashMap<SessionId, StoredSession>>,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionStore {
    pub fn new(lifetime: Duration, clock: Arc<dyn Clock>) -> Self {
        info!("Initializing session store with DashMap (lifetime {}s)", lifetime.num_seconds());
        Self {
            storage: Arc::new(DashMap::new()),
            lifetime,
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Returns number of sessions removed
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let start_len = self.storage.len();
        self.storage.retain(|_, session| session.expires_at >= now);
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            info!("Cleaned up {} expired sessions", count);
        }

        count
    }

    /// Periodic `cleanup_expired` on the tokio runtime
    pub fn spawn_cleanup(&self, every: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // First tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.cleanup_expired();
            }
        })
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            active_sessions: self.storage.len(),
            stored_values: self.storage.iter().map(|s| s.values.len()).sum(),
        }
    }

    fn is_live(&self, session: &SessionId) -> bool {
        let now = self.clock.now();
        let expired = match self.storage.get(session) {
            Some(entry) => entry.expires_at < now,
            None => return false,
        };

        if expired {
            // Read guard released above
            self.storage.remove(session);
            debug!("Session {} expired, removed from store", session);
        }
        !expired
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, session: &SessionId, key: &str) -> Option<String> {
        if !self.is_live(session) {
            return None;
        }
        self.storage.get(session)?.values.get(key).cloned()
    }

    fn set(&self, session: &SessionId, key: &str, value: String) {
        let live = self.is_live(session);
        let now = self.clock.now();
        let lifetime = self.lifetime;

        let mut entry = self.storage.entry(session.clone()).or_insert_with(|| StoredSession {
            values: HashMap::new(),
            expires_at: now + lifetime,
        });
        if !live {
            debug!("Session {} created in store", session);
        }
        entry.values.insert(key.to_string(), value);
    }

    fn remove(&self, session: &SessionId, key: &str) -> Option<String> {
        let mut entry = self.storage.get_mut(session)?;
        entry.values.remove(key)
    }

    fn renew(&self, session: &SessionId, until: DateTime<Utc>) {
        if !self.is_live(session) {
            return;
        }
        if let Some(mut entry) = self.storage.get_mut(session) {
            if entry.expires_at < until {
                debug!("Session {} renewed until {}", session, until);
                entry.expires_at = until;
            }
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub active_sessions: usize,
    pub stored_values: usize,
}
