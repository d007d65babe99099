//! Conversation memory management module
//!
//! Provides session-scoped conversation state with:
//! - Thread-safe session storage (DashMap) with absolute lifetime
//! - 24-hour conversation records, evicted on first access after expiry
//! - Bounded message history and topic list
//! - Pluggable fact and topic extraction

pub mod extractor;
pub mod memory;
pub mod store;
pub mod types;

pub use extractor::{Extraction, FactExtractor, PhraseFactExtractor};
pub use memory::{ConversationMemory, SessionMemory, CONVERSATION_KEY};
pub use store::{InMemorySessionStore, SessionStore, StoreStats};
pub use types::{
    ConversationRecord, Fact, MemoryStatus, MemorySummary, Message, Role, SessionId,
};
