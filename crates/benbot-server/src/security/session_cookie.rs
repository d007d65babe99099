use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::services::conversation::SessionId;
use crate::utils::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies the client session cookie.
///
/// Cookie value format: `{session_id}.{hex(HMAC-SHA256(secret, session_id))}`
#[derive(Clone)]
pub struct SessionCookie {
    secret: Vec<u8>,
    name: String,
    max_age: u64,
    secure: bool,
}

impl SessionCookie {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            secret: config.secret_key.as_bytes().to_vec(),
            name: config.cookie_name.clone(),
            max_age: config.lifetime_seconds,
            secure: config.secure_cookie,
        }
    }

    fn mac(&self) -> Result<HmacSha256, ApiError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ApiError::InternalError(format!("HMAC error: {}", e)))
    }

    /// Signed cookie value for a session id
    pub fn sign(&self, session: &SessionId) -> Result<String, ApiError> {
        let mut mac = self.mac()?;
        mac.update(session.as_str().as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}", session, signature))
    }

    /// Session id carried by a cookie value, if the signature checks out
    pub fn verify(&self, value: &str) -> Option<SessionId> {
        let (id, signature) = value.rsplit_once('.')?;
        if id.is_empty() {
            return None;
        }
        let signature = hex::decode(signature).ok()?;

        let mut mac = self.mac().ok()?;
        mac.update(id.as_bytes());
        // Constant-time comparison
        match mac.verify_slice(&signature) {
            Ok(()) => Some(SessionId::new(id)),
            Err(_) => {
                warn!("Rejected session cookie with invalid signature");
                None
            }
        }
    }

    /// Verified session id from the request's `Cookie` headers
    pub fn read(&self, headers: &HeaderMap) -> Option<SessionId> {
        let value = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value)?;

        let session = self.verify(value);
        if session.is_some() {
            debug!("Session cookie accepted");
        }
        session
    }

    /// `Set-Cookie` value issuing a session to the client
    pub fn set_cookie(&self, session: &SessionId) -> Result<HeaderValue, ApiError> {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.name,
            self.sign(session)?,
            self.max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }

        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::InternalError(format!("Invalid cookie header: {}", e)))
    }
}
