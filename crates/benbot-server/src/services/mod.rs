pub mod conversation;
pub mod gemini;
pub mod llm;
pub mod proxy;

pub use conversation::ConversationMemory;
pub use gemini::GeminiService;
pub use llm::{Completion, GenerationParams, LanguageModel};
pub use proxy::ProxyPool;
