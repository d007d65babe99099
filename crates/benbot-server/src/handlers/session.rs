use axum::{
    extract::FromRequestParts,
    http::{header::SET_COOKIE, request::Parts, HeaderValue},
    response::{IntoResponseParts, ResponseParts},
};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

use crate::security::SessionCookie;
use crate::services::conversation::SessionId;
use crate::state::AppState;
use crate::utils::error::ApiError;

/// Session of the calling client, taken from the signed cookie.
///
/// Missing or tampered cookies start a new session; returning the extractor
/// as a response part then issues the cookie.
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub id: SessionId,
    set_cookie: Option<HeaderValue>,
}

impl ClientSession {
    /// Issue the cookie again so its Max-Age restarts now
    pub fn reissue(&mut self, cookie: &SessionCookie) -> Result<(), ApiError> {
        self.set_cookie = Some(cookie.set_cookie(&self.id)?);
        Ok(())
    }
}

impl FromRequestParts<Arc<AppState>> for ClientSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        if let Some(id) = state.session_cookie.read(&parts.headers) {
            return Ok(Self { id, set_cookie: None });
        }

        let id = SessionId::generate();
        debug!("Starting client session {}", id);
        let set_cookie = state.session_cookie.set_cookie(&id)?;

        Ok(Self {
            id,
            set_cookie: Some(set_cookie),
        })
    }
}

impl IntoResponseParts for ClientSession {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Some(cookie) = self.set_cookie {
            res.headers_mut().append(SET_COOKIE, cookie);
        }
        Ok(res)
    }
}
