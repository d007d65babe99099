pub mod settings;

pub use settings::{
    LlmConfig, LoggingConfig, MemoryConfig, ProxyConfig, ServerConfig, SessionConfig, Settings,
};
