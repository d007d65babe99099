use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use futures::future::join_all;
use std::sync::Arc;
use tracing::info;

use crate::models::proxy::{
    DirectLink, LinkStatus, PoolCounts, ProxyListQuery, ProxyListResponse, VpnLink, VpnTestResponse,
};
use crate::services::proxy::ProxyEntry;
use crate::state::AppState;
use crate::utils::error::ApiError;

/// Proxies listed in the response
const LISTED_PROXIES: usize = 20;
/// Leading proxies probed for the `working` list
const PROBED_PROXIES: usize = 5;

pub async fn list_proxies(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ProxyListQuery>, QueryRejection>,
) -> Result<Json<ProxyListResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let snapshot = state.proxy_pool.snapshot(query.force_refresh()).await;
    let listed: Vec<ProxyEntry> = snapshot.entries.iter().take(LISTED_PROXIES).cloned().collect();

    let probed = &listed[..listed.len().min(PROBED_PROXIES)];
    let results = join_all(probed.iter().map(|entry| state.proxy_pool.test_proxy(entry))).await;
    let working: Vec<ProxyEntry> = probed
        .iter()
        .zip(results)
        .filter(|(_, alive)| *alive)
        .map(|(entry, _)| entry.clone())
        .collect();

    info!(
        "Proxy list: total={}, working={}/{}, cached={}",
        snapshot.entries.len(),
        working.len(),
        probed.len(),
        snapshot.from_cache
    );

    Ok(Json(ProxyListResponse {
        success: true,
        total: snapshot.entries.len(),
        proxies: listed,
        working,
        cached: snapshot.from_cache,
        timestamp: state.clock.now(),
    }))
}

/// Public IP seen through a proxy and directly, plus pool health
pub async fn vpn_test(State(state): State<Arc<AppState>>) -> Json<VpnTestResponse> {
    let pool = &state.proxy_pool;
    let (vpn, direct) = tokio::join!(pool.get_ip_info(true), pool.get_ip_info(false));
    let total = pool.get_proxies(false).await.len();
    let working = usize::from(pool.get_working_proxy().await.is_some());

    Json(VpnTestResponse {
        success: true,
        vpn: VpnLink {
            status: LinkStatus::from_success(vpn.success),
            ip: vpn.ip,
            proxy: vpn.proxy_used,
            method: vpn.method,
        },
        direct: DirectLink {
            status: LinkStatus::from_success(direct.success),
            ip: direct.ip,
            method: direct.method,
        },
        proxies: PoolCounts { total, working },
        timestamp: state.clock.now(),
    })
}
