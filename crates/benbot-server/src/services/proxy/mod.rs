//! Public proxy pool
//!
//! - Aggregates plaintext proxy lists from several sources
//! - Caches the list for a configurable TTL (lazy refresh, no background task)
//! - Probes shuffled candidates to find one that actually forwards traffic
//! - Falls back to direct requests whenever the proxied attempt fails

pub mod entry;
pub mod pool;
pub mod transport;

pub use entry::{is_valid_proxy_shape, parse_proxy_list, ProxyEntry};
pub use pool::{FetchMethod, IpInfo, PoolSnapshot, ProxiedFetch, ProxyPool};
pub use transport::{FetchOutcome, ProxyTransport, ReqwestTransport};
