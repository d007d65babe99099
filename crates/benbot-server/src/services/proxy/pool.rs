use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ProxyConfig;
use crate::utils::Clock;

use super::entry::{parse_proxy_list, ProxyEntry};
use super::transport::{FetchOutcome, ProxyTransport};

/// Cached proxy list, replaced wholesale on refresh
#[derive(Debug, Clone)]
struct PoolCache {
    entries: Vec<ProxyEntry>,
    refreshed_at: DateTime<Utc>,
}

/// What `snapshot` served and where it came from
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pub entries: Vec<ProxyEntry>,
    pub from_cache: bool,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchMethod {
    #[serde(rename = "VPN")]
    Proxy,
    Direct,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxiedFetch {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub proxy_used: Option<ProxyEntry>,
    pub method: FetchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpInfo {
    pub success: bool,
    pub ip: Option<String>,
    pub proxy_used: Option<ProxyEntry>,
    pub method: FetchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct IpLookupBody {
    ip: String,
}

/// Public proxy pool with a lazily refreshed, TTL-bound cache.
///
/// Nothing here returns an error: unreachable sources, dead proxies and
/// failed lookups all degrade to empty lists, `false`, `None` or a
/// `FetchMethod::Failed` result.
pub struct ProxyPool {
    config: ProxyConfig,
    transport: Arc<dyn ProxyTransport>,
    clock: Arc<dyn Clock>,
    cache: RwLock<Option<PoolCache>>,
}

impl ProxyPool {
    pub fn new(config: ProxyConfig, transport: Arc<dyn ProxyTransport>, clock: Arc<dyn Clock>) -> Self {
        info!(
            "Initializing proxy pool: {} sources, ttl={}s, max_entries={}",
            config.sources.len(),
            config.cache_ttl_seconds,
            config.max_entries
        );
        Self {
            config,
            transport,
            clock,
            cache: RwLock::new(None),
        }
    }

    /// Cached entries while fresh, otherwise a refresh
    pub async fn get_proxies(&self, force_refresh: bool) -> Vec<ProxyEntry> {
        self.snapshot(force_refresh).await.entries
    }

    pub async fn snapshot(&self, force_refresh: bool) -> PoolSnapshot {
        if !force_refresh {
            if let Some(cache) = self.fresh_cache() {
                return PoolSnapshot {
                    entries: cache.entries,
                    from_cache: true,
                    refreshed_at: cache.refreshed_at,
                };
            }
        }

        // Concurrent refreshes may race; the last writer wins
        let refreshed_at = self.clock.now();
        let entries = self.refresh().await;
        *self.cache.write() = Some(PoolCache {
            entries: entries.clone(),
            refreshed_at,
        });

        PoolSnapshot {
            entries,
            from_cache: false,
            refreshed_at,
        }
    }

    fn fresh_cache(&self) -> Option<PoolCache> {
        let guard = self.cache.read();
        let cache = guard.as_ref()?;
        let age = self.clock.now() - cache.refreshed_at;
        (age < self.config.cache_ttl()).then(|| cache.clone())
    }

    async fn refresh(&self) -> Vec<ProxyEntry> {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for source in &self.config.sources {
            let outcome = self
                .transport
                .get(source, None, self.config.source_timeout())
                .await;

            let body = match outcome {
                FetchOutcome::Ok { status: 200, body } => body,
                other => {
                    debug!("Proxy source unavailable ({}): {}", other.describe(), source);
                    continue;
                }
            };

            let before = entries.len();
            for entry in parse_proxy_list(&body) {
                if seen.insert(entry.clone()) {
                    entries.push(entry);
                }
            }
            debug!("Proxy source {} contributed {} new entries", source, entries.len() - before);
        }

        entries.truncate(self.config.max_entries);
        info!("Proxy pool refreshed: {} entries", entries.len());
        entries
    }

    /// One GET through `entry` against the echo endpoint
    pub async fn test_proxy(&self, entry: &ProxyEntry) -> bool {
        let outcome = self
            .transport
            .get(&self.config.probe_url, Some(entry.clone()), self.config.probe_timeout())
            .await;

        let alive = outcome.is_ok_200();
        debug!("Probe {} -> {}", entry, if alive { "alive" } else { "dead" });
        alive
    }

    /// Shuffle the pool and probe at most `probe_limit` candidates
    pub async fn get_working_proxy(&self) -> Option<ProxyEntry> {
        let mut candidates = self.get_proxies(false).await;
        if candidates.is_empty() {
            debug!("Proxy pool empty, no probe attempted");
            return None;
        }

        candidates.shuffle(&mut rand::rng());

        for candidate in candidates.into_iter().take(self.config.probe_limit) {
            if self.test_proxy(&candidate).await {
                info!("Working proxy found: {}", candidate);
                return Some(candidate);
            }
        }

        warn!("No working proxy among the first {} candidates", self.config.probe_limit);
        None
    }

    /// One attempt through a working proxy, then one direct attempt
    pub async fn fetch_via_proxy(&self, url: &str) -> ProxiedFetch {
        if let Some(proxy) = self.get_working_proxy().await {
            let outcome = self
                .transport
                .get(url, Some(proxy.clone()), self.config.proxied_timeout())
                .await;

            match outcome.into_ok_body() {
                Some(body) => {
                    return ProxiedFetch {
                        success: true,
                        body: Some(body),
                        proxy_used: Some(proxy),
                        method: FetchMethod::Proxy,
                        error: None,
                    }
                }
                None => warn!("Fetch via {} failed, falling back to direct", proxy),
            }
        }

        self.fetch_direct(url).await
    }

    pub async fn fetch_direct(&self, url: &str) -> ProxiedFetch {
        let outcome = self
            .transport
            .get(url, None, self.config.direct_timeout())
            .await;

        match outcome {
            FetchOutcome::Ok { status: 200, body } => ProxiedFetch {
                success: true,
                body: Some(body),
                proxy_used: None,
                method: FetchMethod::Direct,
                error: None,
            },
            other => ProxiedFetch {
                success: false,
                body: None,
                proxy_used: None,
                method: FetchMethod::Failed,
                error: Some(other.describe()),
            },
        }
    }

    /// Public IP as seen by the lookup service, through a proxy when asked
    pub async fn get_ip_info(&self, use_vpn: bool) -> IpInfo {
        let url = self.config.ip_lookup_url.clone();

        if use_vpn {
            let fetch = self.fetch_via_proxy(&url).await;
            if let Some(ip) = fetch.body.as_deref().and_then(parse_ip) {
                return IpInfo {
                    success: true,
                    ip: Some(ip),
                    proxy_used: fetch.proxy_used,
                    method: fetch.method,
                    error: None,
                };
            }
            // Only an unparseable proxied body earns a direct retry here;
            // every other failure path already included the direct attempt
            if fetch.method != FetchMethod::Proxy {
                return failed_lookup(fetch.error.unwrap_or_else(|| "Unparseable IP lookup response".to_string()));
            }
        }

        let fetch = self.fetch_direct(&url).await;
        match fetch.body.as_deref().and_then(parse_ip) {
            Some(ip) => IpInfo {
                success: true,
                ip: Some(ip),
                proxy_used: None,
                method: FetchMethod::Direct,
                error: None,
            },
            None => failed_lookup(fetch.error.unwrap_or_else(|| "Unparseable IP lookup response".to_string())),
        }
    }

    /// Age of the cached list, `None` before the first refresh
    pub fn cache_age(&self) -> Option<chrono::Duration> {
        let guard = self.cache.read();
        guard.as_ref().map(|c| self.clock.now() - c.refreshed_at)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().as_ref().map_or(0, |c| c.entries.len())
    }

    pub fn is_cached(&self) -> bool {
        self.cache.read().is_some()
    }
}

fn parse_ip(body: &str) -> Option<String> {
    serde_json::from_str::<IpLookupBody>(body).ok().map(|b| b.ip)
}

fn failed_lookup(error: String) -> IpInfo {
    IpInfo {
        success: false,
        ip: None,
        proxy_used: None,
        method: FetchMethod::Failed,
        error: Some(error),
    }
}
