use async_trait::async_trait;
use reqwest::{Client, Proxy};
use std::time::Duration;
use tracing::debug;

use super::entry::ProxyEntry;

/// Result of one outbound GET. Failures are values, not errors: dead
/// proxies and unreachable list sources are the normal case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Ok { status: u16, body: String },
    Failed(String),
}

impl FetchOutcome {
    /// Body of a 200 response
    pub fn into_ok_body(self) -> Option<String> {
        match self {
            FetchOutcome::Ok { status: 200, body } => Some(body),
            _ => None,
        }
    }

    pub fn is_ok_200(&self) -> bool {
        matches!(self, FetchOutcome::Ok { status: 200, .. })
    }

    pub fn describe(&self) -> String {
        match self {
            FetchOutcome::Ok { status, .. } => format!("HTTP {}", status),
            FetchOutcome::Failed(reason) => reason.clone(),
        }
    }
}

/// Outbound HTTP with per-call proxy override and timeout
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    async fn get(&self, url: &str, via: Option<ProxyEntry>, timeout: Duration) -> FetchOutcome;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    direct: Client,
    user_agent: String,
}

impl ReqwestTransport {
    pub fn new(user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        Self {
            direct: Client::builder()
                .user_agent(user_agent.clone())
                .build()
                .unwrap_or_else(|_| Client::new()),
            user_agent,
        }
    }

    /// reqwest binds proxies at client build time, so each proxied call
    /// gets its own short-lived client.
    fn proxied_client(&self, entry: &ProxyEntry) -> Result<Client, String> {
        let proxy = Proxy::all(entry.proxy_url()).map_err(|e| format!("Invalid proxy {}: {}", entry, e))?;
        Client::builder()
            .proxy(proxy)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| format!("Failed to build client for {}: {}", entry, e))
    }
}

#[async_trait]
impl ProxyTransport for ReqwestTransport {
    async fn get(&self, url: &str, via: Option<ProxyEntry>, timeout: Duration) -> FetchOutcome {
        let client = match &via {
            Some(entry) => match self.proxied_client(entry) {
                Ok(client) => client,
                Err(reason) => return FetchOutcome::Failed(reason),
            },
            None => self.direct.clone(),
        };

        let response = match client.get(url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("GET {} via {:?} failed: {}", url, via.as_ref().map(ProxyEntry::as_str), e);
                return FetchOutcome::Failed(e.to_string());
            }
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => FetchOutcome::Ok { status, body },
            Err(e) => FetchOutcome::Failed(format!("Failed to read body: {}", e)),
        }
    }
}
