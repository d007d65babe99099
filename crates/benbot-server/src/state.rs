use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Settings;
use crate::security::SessionCookie;
use crate::services::conversation::{ConversationMemory, InMemorySessionStore, PhraseFactExtractor};
use crate::services::proxy::{ProxyTransport, ReqwestTransport};
use crate::services::{GeminiService, LanguageModel, ProxyPool};
use crate::utils::{Clock, SystemClock};

/// Application state shared across handlers
pub struct AppState {
    pub settings: Settings,
    pub proxy_pool: Arc<ProxyPool>,
    pub memory: Arc<ConversationMemory>,
    pub session_store: Arc<InMemorySessionStore>,
    pub session_cookie: SessionCookie,
    pub llm: Arc<dyn LanguageModel>,
    pub clock: Arc<dyn Clock>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Production wiring: reqwest transport, Gemini, wall clock
    pub fn from_settings(settings: Settings) -> Self {
        let transport = Arc::new(ReqwestTransport::new(settings.proxy.user_agent.clone()));
        let llm = Arc::new(GeminiService::new(settings.llm.clone()));
        Self::new(settings, transport, llm, Arc::new(SystemClock))
    }

    pub fn new(
        settings: Settings,
        transport: Arc<dyn ProxyTransport>,
        llm: Arc<dyn LanguageModel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let proxy_pool = Arc::new(ProxyPool::new(settings.proxy.clone(), transport, clock.clone()));

        let session_store = Arc::new(InMemorySessionStore::new(
            chrono::Duration::seconds(settings.session.lifetime_seconds as i64),
            clock.clone(),
        ));

        let memory = Arc::new(ConversationMemory::new(
            session_store.clone(),
            clock.clone(),
            settings.memory.clone(),
            Arc::new(PhraseFactExtractor::default()),
        ));

        Self {
            session_cookie: SessionCookie::new(&settings.session),
            started_at: clock.now(),
            settings,
            proxy_pool,
            memory,
            session_store,
            llm,
            clock,
        }
    }
}
