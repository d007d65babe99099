use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::services::proxy::{FetchMethod, ProxyEntry};

#[derive(Debug, Default, Deserialize)]
pub struct ProxyListQuery {
    #[serde(default)]
    pub refresh: Option<String>,
}

impl ProxyListQuery {
    /// Only "true" (any case) forces a refresh; anything else reads the cache
    pub fn force_refresh(&self) -> bool {
        self.refresh
            .as_deref()
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}


#[derive(Debug, Serialize)]
pub struct ProxyListResponse {
    pub success: bool,
    pub total: usize,
    pub proxies: Vec<ProxyEntry>,
    pub working: Vec<ProxyEntry>,
    pub cached: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Connected,
    Failed,
}

impl LinkStatus {
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Connected
        } else {
            Self::Failed
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VpnLink {
    pub ip: Option<String>,
    pub proxy: Option<ProxyEntry>,
    pub status: LinkStatus,
    pub method: FetchMethod,
}

#[derive(Debug, Serialize)]
pub struct DirectLink {
    pub ip: Option<String>,
    pub status: LinkStatus,
    pub method: FetchMethod,
}

#[derive(Debug, Serialize)]
pub struct PoolCounts {
    pub total: usize,
    pub working: usize,
}

#[derive(Debug, Serialize)]
pub struct VpnTestResponse {
    pub success: bool,
    pub vpn: VpnLink,
    pub direct: DirectLink,
    pub proxies: PoolCounts,
    pub timestamp: DateTime<Utc>,
}
