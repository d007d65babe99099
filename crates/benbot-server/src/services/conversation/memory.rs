use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::extractor::{FactExtractor, NAME_FACT};
use super::store::SessionStore;
use super::types::{
    format_duration, ConversationRecord, Fact, MemoryStatus, MemorySummary, Message, Role,
    SessionId,
};
use crate::config::MemoryConfig;
use crate::utils::Clock;

/// Session-store key holding the serialized `ConversationRecord`
pub const CONVERSATION_KEY: &str = "conversation";

/// 24-hour conversation memory on top of a session store
pub struct ConversationMemory {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    config: MemoryConfig,
    extractor: Arc<dyn FactExtractor>,
}

impl ConversationMemory {
    pub fn new(
        store: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        config: MemoryConfig,
        extractor: Arc<dyn FactExtractor>,
    ) -> Self {
        info!(
            "Initializing conversation memory: ttl={}s, max_messages={}, max_topics={}",
            config.record_ttl_seconds, config.max_messages, config.max_topics
        );
        Self {
            store,
            clock,
            config,
            extractor,
        }
    }

    /// Operations scoped to one client session
    pub fn session<'a>(&'a self, session: &'a SessionId) -> SessionMemory<'a> {
        SessionMemory {
            memory: self,
            session,
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }
}

/// Handle on the conversation record of one session.
///
/// Absence and expiry are never errors: reads come back empty, writes start
/// a fresh record.
pub struct SessionMemory<'a> {
    memory: &'a ConversationMemory,
    session: &'a SessionId,
}

impl SessionMemory<'_> {
    fn load(&self) -> Option<ConversationRecord> {
        let raw = self.memory.store.get(self.session, CONVERSATION_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Discarding unreadable conversation for session {}: {}", self.session, e);
                self.memory.store.remove(self.session, CONVERSATION_KEY);
                None
            }
        }
    }

    fn save(&self, record: &ConversationRecord) {
        match serde_json::to_string(record) {
            Ok(raw) => self.memory.store.set(self.session, CONVERSATION_KEY, raw),
            Err(e) => error!("Failed to serialize conversation {}: {}", record.id, e),
        }
    }

    /// The record if present and alive; a dead record is evicted here
    fn live_record(&self) -> Option<ConversationRecord> {
        let record = self.load()?;
        if record.is_expired_at(self.memory.clock.now()) {
            self.memory.store.remove(self.session, CONVERSATION_KEY);
            info!("Conversation {} expired, evicted (session {})", record.id, self.session);
            return None;
        }
        Some(record)
    }

    /// True when there is no live record. Evicts a dead one as a side effect.
    pub fn is_expired(&self) -> bool {
        self.live_record().is_none()
    }

    pub fn is_active(&self) -> bool {
        !self.is_expired()
    }

    /// Live record, creating a fresh one when absent or expired
    pub fn ensure_active(&self) -> ConversationRecord {
        if let Some(record) = self.live_record() {
            return record;
        }

        let record = ConversationRecord::new(self.memory.clock.now(), self.memory.config.record_ttl());
        self.save(&record);
        // The session must last as long as the record it carries
        self.memory.store.renew(self.session, record.expires_at);
        info!("Conversation {} created for session {}", record.id, self.session);
        record
    }

    pub fn add_message(&self, role: Role, content: impl Into<String>) -> Message {
        let mut record = self.ensure_active();
        let message = record.push_message(
            role,
            content.into(),
            self.memory.clock.now(),
            self.memory.config.max_messages,
        );
        self.save(&record);
        debug!(
            "Session {}: {} message #{} stored ({} kept)",
            self.session,
            role.as_str(),
            record.message_count,
            record.messages.len()
        );
        message
    }

    /// Sliding window of the newest `limit` messages, oldest first
    pub fn get_context(&self, limit: usize) -> Vec<Message> {
        self.live_record()
            .map(|r| r.recent(limit).to_vec())
            .unwrap_or_default()
    }

    pub fn remember_fact(&self, key: &str, value: impl Into<String>) {
        let mut record = self.ensure_active();
        record.remember(key, value.into(), self.memory.clock.now());
        self.save(&record);
    }

    pub fn get_fact(&self, key: &str) -> Option<String> {
        self.live_record()?.user_info.remove(key).map(|f| f.value)
    }

    pub fn get_all_facts(&self) -> BTreeMap<String, Fact> {
        self.live_record().map(|r| r.user_info).unwrap_or_default()
    }

    pub fn add_topic(&self, label: &str) {
        let mut record = self.ensure_active();
        if record.push_topic(label, self.memory.config.max_topics) {
            self.save(&record);
        }
    }

    pub fn topics(&self) -> Vec<String> {
        self.live_record().map(|r| r.topics).unwrap_or_default()
    }

    pub fn summary(&self) -> Option<MemorySummary> {
        self.live_record().map(|r| r.summary(self.memory.clock.now()))
    }

    /// Memory block for chat responses
    pub fn status(&self) -> MemoryStatus {
        let Some(record) = self.live_record() else {
            return MemoryStatus::inactive();
        };
        let now = self.memory.clock.now();

        MemoryStatus {
            active: true,
            expires_in: format_duration(record.expires_at - now),
            time_remaining: record.seconds_remaining(now),
            message_count: record.message_count,
            user_name: record.user_info.get(NAME_FACT).map(|f| f.value.clone()),
        }
    }

    /// Run the extractor over a user message and store what it finds
    pub fn observe_user_message(&self, text: &str) {
        let extraction = self.memory.extractor.extract(text);
        if extraction.facts.is_empty() && extraction.topics.is_empty() {
            return;
        }

        let mut record = self.ensure_active();
        let now = self.memory.clock.now();
        for (key, value) in extraction.facts {
            debug!("Session {}: remembered {}", self.session, key);
            record.remember(&key, value, now);
        }
        for topic in extraction.topics {
            record.push_topic(&topic, self.memory.config.max_topics);
        }
        self.save(&record);
    }

    /// Remove the record whatever its state
    pub fn clear(&self) {
        if self.memory.store.remove(self.session, CONVERSATION_KEY).is_some() {
            info!("Conversation cleared for session {}", self.session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conversation::extractor::{Extraction, PhraseFactExtractor};
    use crate::services::conversation::store::InMemorySessionStore;
    use crate::utils::ManualClock;
    use chrono::Duration;

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<InMemorySessionStore>,
        memory: ConversationMemory,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::at_epoch());
        // Session outlives the record so record expiry is what gets observed
        let store = Arc::new(InMemorySessionStore::new(Duration::days(30), clock.clone()));
        let memory = ConversationMemory::new(
            store.clone(),
            clock.clone(),
            MemoryConfig::default(),
            Arc::new(PhraseFactExtractor::default()),
        );
        Fixture { clock, store, memory }
    }

    #[test]
    fn test_fresh_session_single_message_context() {
        let f = fixture();
        let id = SessionId::new("s1");
        let session = f.memory.session(&id);

        session.add_message(Role::User, "Bonjour");
        let context = session.get_context(10);

        assert_eq!(context.len(), 1);
        assert_eq!(context[0].role, Role::User);
        assert_eq!(context[0].content, "Bonjour");
        assert_eq!(context[0].id, 0);
    }

    #[test]
    fn test_absent_record_reads_empty() {
        let f = fixture();
        let id = SessionId::new("nobody");
        let session = f.memory.session(&id);

        assert!(session.is_expired());
        assert!(session.get_context(10).is_empty());
        assert_eq!(session.get_fact("name"), None);
        assert!(session.get_all_facts().is_empty());
        assert!(session.summary().is_none());
        assert_eq!(session.status(), MemoryStatus::inactive());
        // Reads never create a record
        assert!(f.store.is_empty());
    }

    #[test]
    fn test_ensure_active_is_idempotent() {
        let f = fixture();
        let id = SessionId::new("s1");
        let session = f.memory.session(&id);

        let first = session.ensure_active();
        f.clock.advance(Duration::hours(1));
        let second = session.ensure_active();

        assert_eq!(first.id, second.id);
        assert_eq!(second.expires_at, first.created_at + Duration::seconds(86_400));
    }

    #[test]
    fn test_expiry_boundary_scenario() {
        let f = fixture();
        let id = SessionId::new("s1");
        let session = f.memory.session(&id);

        let record = session.ensure_active();
        session.add_message(Role::User, "hello");

        f.clock.set(record.created_at + Duration::seconds(86_399));
        assert!(!session.is_expired());
        assert_eq!(session.get_context(10).len(), 1);

        f.clock.set(record.created_at + Duration::seconds(86_400));
        assert!(!session.is_expired());

        f.clock.set(record.created_at + Duration::seconds(86_401));
        assert!(session.is_expired());
        assert!(session.get_context(10).is_empty());
        // Evicted, not just hidden
        assert_eq!(f.store.get(&id, CONVERSATION_KEY), None);
    }

    #[test]
    fn test_record_recreated_after_clear_lives_full_ttl() {
        let clock = Arc::new(ManualClock::at_epoch());
        // Session lifetime equal to the record TTL, as deployed
        let store = Arc::new(InMemorySessionStore::new(Duration::seconds(86_400), clock.clone()));
        let memory = ConversationMemory::new(
            store.clone(),
            clock.clone(),
            MemoryConfig::default(),
            Arc::new(PhraseFactExtractor::default()),
        );
        let id = SessionId::new("s1");
        let session = memory.session(&id);

        session.add_message(Role::User, "first");
        clock.advance(Duration::hours(12));
        session.clear();
        session.add_message(Role::User, "second");
        let created = clock.now();

        clock.set(created + Duration::hours(13));
        assert!(!session.is_expired());
        assert_eq!(session.get_context(10)[0].content, "second");

        clock.set(created + Duration::seconds(86_400));
        assert!(!session.is_expired());

        clock.set(created + Duration::seconds(86_401));
        assert!(session.is_expired());
    }

    #[test]
    fn test_write_after_expiry_starts_new_record() {
        let f = fixture();
        let id = SessionId::new("s1");
        let session = f.memory.session(&id);

        session.add_message(Role::User, "old");
        session.remember_fact("name", "Ben");
        let old = session.summary().unwrap();

        f.clock.advance(Duration::seconds(86_401));
        session.add_message(Role::User, "new");

        let new = session.summary().unwrap();
        assert_ne!(old.id, new.id);
        assert_eq!(new.message_count, 1);
        assert_eq!(session.get_fact("name"), None);
        assert_eq!(session.get_context(10)[0].content, "new");
        assert_eq!(new.expires_at, f.clock.now() + Duration::seconds(86_400));
    }

    #[test]
    fn test_sixty_messages_keep_last_fifty_in_order() {
        let f = fixture();
        let id = SessionId::new("s1");
        let session = f.memory.session(&id);

        for i in 0..60 {
            session.add_message(if i % 2 == 0 { Role::User } else { Role::Assistant }, format!("m{}", i));
        }

        let all = session.get_context(100);
        assert_eq!(all.len(), 50);
        let contents: Vec<_> = all.iter().map(|m| m.content.clone()).collect();
        let expected: Vec<_> = (10..60).map(|i| format!("m{}", i)).collect();
        assert_eq!(contents, expected);

        let window = session.get_context(10);
        assert_eq!(window.first().unwrap().content, "m50");
        assert_eq!(window.last().unwrap().content, "m59");
        assert_eq!(session.summary().unwrap().message_count, 60);
    }

    #[test]
    fn test_topics_dedup_and_cap() {
        let f = fixture();
        let id = SessionId::new("s1");
        let session = f.memory.session(&id);

        session.add_topic("rust");
        session.add_topic("rust");
        assert_eq!(session.topics(), vec!["rust".to_string()]);

        for i in 0..11 {
            session.add_topic(&format!("topic{}", i));
        }
        let topics = session.topics();
        assert_eq!(topics.len(), 10);
        let expected: Vec<_> = (1..11).map(|i| format!("topic{}", i)).collect();
        assert_eq!(topics, expected);
    }

    #[test]
    fn test_facts_upsert() {
        let f = fixture();
        let id = SessionId::new("s1");
        let session = f.memory.session(&id);

        session.remember_fact("name", "Ben");
        f.clock.advance(Duration::seconds(5));
        session.remember_fact("name", "Benjamin");
        session.remember_fact("city", "Lyon");

        assert_eq!(session.get_fact("name").as_deref(), Some("Benjamin"));
        let all = session.get_all_facts();
        assert_eq!(all.len(), 2);
        assert_eq!(all["name"].timestamp, f.clock.now());
    }

    #[test]
    fn test_summary_duration_from_first_message_not_creation() {
        let f = fixture();
        let id = SessionId::new("s1");
        let session = f.memory.session(&id);

        session.ensure_active();
        f.clock.advance(Duration::minutes(10));
        assert_eq!(session.summary().unwrap().duration_formatted, "0h 00m 00s");

        session.add_message(Role::User, "first");
        f.clock.advance(Duration::seconds(90));

        let summary = session.summary().unwrap();
        assert_eq!(summary.duration_formatted, "0h 01m 30s");
        assert_eq!(summary.seconds_remaining, 86_400 - 600 - 90);
    }

    #[test]
    fn test_clear_removes_regardless_of_state() {
        let f = fixture();
        let id = SessionId::new("s1");
        let session = f.memory.session(&id);

        session.add_message(Role::User, "hi");
        session.clear();
        assert!(session.is_expired());

        // Clearing an expired record also works
        session.add_message(Role::User, "hi again");
        f.clock.advance(Duration::days(2));
        session.clear();
        assert_eq!(f.store.get(&id, CONVERSATION_KEY), None);
    }

    #[test]
    fn test_observe_user_message_stores_name_and_topics() {
        let f = fixture();
        let id = SessionId::new("s1");
        let session = f.memory.session(&id);

        session.observe_user_message("Salut, je m'appelle benoit, j'ai un bug dans mon code");
        let status = session.status();

        assert!(status.active);
        assert_eq!(status.user_name.as_deref(), Some("Benoit"));
        assert_eq!(session.topics(), vec!["programming".to_string()]);
        assert_eq!(status.expires_in, "24h 00m 00s");
    }

    #[test]
    fn test_corrupt_payload_is_discarded() {
        let f = fixture();
        let id = SessionId::new("s1");
        f.store.set(&id, CONVERSATION_KEY, "{not json".to_string());

        let session = f.memory.session(&id);
        assert!(session.is_expired());
        assert_eq!(f.store.get(&id, CONVERSATION_KEY), None);
    }

    #[test]
    fn test_custom_extractor_is_used() {
        struct Fixed;
        impl FactExtractor for Fixed {
            fn extract(&self, _text: &str) -> Extraction {
                Extraction {
                    facts: vec![("mood".into(), "happy".into())],
                    topics: vec![],
                }
            }
        }

        let clock = Arc::new(ManualClock::at_epoch());
        let store = Arc::new(InMemorySessionStore::new(Duration::days(1), clock.clone()));
        let memory = ConversationMemory::new(store, clock, MemoryConfig::default(), Arc::new(Fixed));
        let id = SessionId::new("s1");

        memory.session(&id).observe_user_message("anything");
        assert_eq!(memory.session(&id).get_fact("mood").as_deref(), Some("happy"));
    }
}
