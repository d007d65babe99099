use serde::{Deserialize, Serialize};
use std::fmt;

/// A `host:port` forward proxy taken from a public list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProxyEntry(String);

impl ProxyEntry {
    /// Accepts a token only if it has the `a.b.c.d:port` shape
    pub fn parse(token: &str) -> Option<Self> {
        is_valid_proxy_shape(token).then(|| Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn host(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }

    pub fn port(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }

    /// URL handed to the HTTP client for both http and https traffic
    pub fn proxy_url(&self) -> String {
        format!("http://{}", self.0)
    }
}

impl fmt::Display for ProxyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Exactly one colon, four non-empty dot-separated host segments, all-digit port.
pub fn is_valid_proxy_shape(candidate: &str) -> bool {
    let mut parts = candidate.split(':');
    let (Some(host), Some(port), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    let mut segments = 0;
    for segment in host.split('.') {
        if segment.is_empty() {
            return false;
        }
        segments += 1;
    }

    segments == 4 && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
}

/// Split a plaintext proxy list into candidate tokens.
///
/// The first separator present wins: CRLF, then LF, then any whitespace.
pub fn split_candidates(body: &str) -> Vec<&str> {
    let body = body.trim();
    let tokens: Vec<&str> = if body.contains("\r\n") {
        body.split("\r\n").collect()
    } else if body.contains('\n') {
        body.split('\n').collect()
    } else {
        body.split_whitespace().collect()
    };

    tokens
        .into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Every shape-valid entry of a list body, in body order (duplicates kept)
pub fn parse_proxy_list(body: &str) -> Vec<ProxyEntry> {
    split_candidates(body)
        .into_iter()
        .filter_map(ProxyEntry::parse)
        .collect()
}
