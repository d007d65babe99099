use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Cookie-carried identifier of a client session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Position in the message list at append time; shifts meaning after trims
    pub id: usize,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A remembered piece of user information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

/// Memory of one session, serialized into the session store as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// `created_at` + record TTL; never extended
    pub expires_at: DateTime<Utc>,
    /// Most recent messages, oldest first
    pub messages: Vec<Message>,
    /// Messages ever appended, including trimmed ones
    pub message_count: u64,
    pub user_info: BTreeMap<String, Fact>,
    /// Unique labels, oldest first
    pub topics: Vec<String>,
}

impl ConversationRecord {
    pub fn new(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: record_id(now),
            created_at: now,
            expires_at: now + ttl,
            messages: Vec::new(),
            message_count: 0,
            user_info: BTreeMap::new(),
            topics: Vec::new(),
        }
    }

    /// Dead strictly after `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Append and trim to the newest `max_messages` (FIFO by count)
    pub fn push_message(
        &mut self,
        role: Role,
        content: String,
        now: DateTime<Utc>,
        max_messages: usize,
    ) -> Message {
        let message = Message {
            id: self.messages.len(),
            role,
            content,
            timestamp: now,
        };
        self.messages.push(message.clone());
        self.message_count += 1;

        if self.messages.len() > max_messages {
            let overflow = self.messages.len() - max_messages;
            self.messages.drain(0..overflow);
        }

        message
    }

    /// Returns false when the label was already present
    pub fn push_topic(&mut self, label: &str, max_topics: usize) -> bool {
        if self.topics.iter().any(|t| t == label) {
            return false;
        }
        self.topics.push(label.to_string());

        if self.topics.len() > max_topics {
            let overflow = self.topics.len() - max_topics;
            self.topics.drain(0..overflow);
        }
        true
    }

    pub fn remember(&mut self, key: &str, value: String, now: DateTime<Utc>) {
        self.user_info.insert(key.to_string(), Fact { value, timestamp: now });
    }

    /// Last `limit` messages, oldest first
    pub fn recent(&self, limit: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(limit);
        &self.messages[start..]
    }

    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }

    pub fn summary(&self, now: DateTime<Utc>) -> MemorySummary {
        // From the first kept message, not from record creation
        let duration = self
            .messages
            .first()
            .map(|m| now - m.timestamp)
            .unwrap_or_else(Duration::zero);

        MemorySummary {
            id: self.id.clone(),
            message_count: self.message_count,
            duration_formatted: format_duration(duration),
            created_at: self.created_at,
            expires_at: self.expires_at,
            seconds_remaining: self.seconds_remaining(now),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySummary {
    pub id: String,
    pub message_count: u64,
    pub duration_formatted: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub seconds_remaining: i64,
}

/// Memory block attached to every chat response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatus {
    pub active: bool,
    /// Human readable, e.g. "23h 59m 58s"
    pub expires_in: String,
    /// Seconds
    pub time_remaining: i64,
    pub message_count: u64,
    pub user_name: Option<String>,
}

impl MemoryStatus {
    pub fn inactive() -> Self {
        Self {
            active: false,
            expires_in: format_duration(Duration::zero()),
            time_remaining: 0,
            message_count: 0,
            user_name: None,
        }
    }
}

/// Opaque record id: hex prefix of a hash over the creation instant
fn record_id(now: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(rand::random::<u64>().to_le_bytes());
    hex::encode(&hasher.finalize()[..8])
}

/// "{h}h {mm}m {ss}s"; negative durations clamp to zero
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    format!("{}h {:02}m {:02}s", total / 3600, (total % 3600) / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let record = ConversationRecord::new(epoch(), Duration::seconds(86_400));
        assert!(!record.is_expired_at(epoch() + Duration::seconds(86_400)));
        assert!(record.is_expired_at(epoch() + Duration::seconds(86_401)));
    }

    #[test]
    fn test_push_message_keeps_newest() {
        let mut record = ConversationRecord::new(epoch(), Duration::seconds(86_400));
        for i in 0..60 {
            record.push_message(Role::User, format!("m{}", i), epoch(), 50);
        }

        assert_eq!(record.messages.len(), 50);
        assert_eq!(record.message_count, 60);
        assert_eq!(record.messages.first().unwrap().content, "m10");
        assert_eq!(record.messages.last().unwrap().content, "m59");
    }

    #[test]
    fn test_message_id_is_position_at_append() {
        let mut record = ConversationRecord::new(epoch(), Duration::seconds(10));
        let first = record.push_message(Role::User, "a".into(), epoch(), 2);
        let second = record.push_message(Role::Assistant, "b".into(), epoch(), 2);
        let third = record.push_message(Role::User, "c".into(), epoch(), 2);

        assert_eq!((first.id, second.id, third.id), (0, 1, 2));
        // After the trim the list restarts below the bound
        let fourth = record.push_message(Role::User, "d".into(), epoch(), 2);
        assert_eq!(fourth.id, 2);
    }

    #[test]
    fn test_topics_unique_and_bounded() {
        let mut record = ConversationRecord::new(epoch(), Duration::seconds(10));
        assert!(record.push_topic("rust", 10));
        assert!(!record.push_topic("rust", 10));
        assert!(record.push_topic("Rust", 10));
        assert_eq!(record.topics, vec!["rust", "Rust"]);

        let mut record = ConversationRecord::new(epoch(), Duration::seconds(10));
        for i in 0..11 {
            record.push_topic(&format!("t{}", i), 10);
        }
        assert_eq!(record.topics.len(), 10);
        assert_eq!(record.topics.first().map(String::as_str), Some("t1"));
        assert_eq!(record.topics.last().map(String::as_str), Some("t10"));
    }

    #[test]
    fn test_summary_duration_from_first_message() {
        let mut record = ConversationRecord::new(epoch(), Duration::seconds(86_400));
        let now = epoch() + Duration::seconds(100);
        assert_eq!(record.summary(now).duration_formatted, "0h 00m 00s");

        record.push_message(Role::User, "hi".into(), epoch() + Duration::seconds(40), 50);
        let summary = record.summary(epoch() + Duration::seconds(3_725 + 40));
        assert_eq!(summary.duration_formatted, "1h 02m 05s");
        assert_eq!(summary.seconds_remaining, 86_400 - 3_765);
        assert_eq!(summary.message_count, 1);
    }

    #[test]
    fn test_record_roundtrips_through_json() {
        let mut record = ConversationRecord::new(epoch(), Duration::seconds(86_400));
        record.push_message(Role::Assistant, "Bonjour".into(), epoch(), 50);
        record.remember("name", "Ben".into(), epoch());

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"role\":\"assistant\""));
        let back: ConversationRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_ids_differ() {
        let a = ConversationRecord::new(epoch(), Duration::seconds(1));
        let b = ConversationRecord::new(epoch(), Duration::seconds(1));
        assert_eq!(a.id.len(), 16);
        assert_ne!(a.id, b.id);
    }
}
