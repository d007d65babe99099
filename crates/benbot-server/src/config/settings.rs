use anyhow::{bail, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub llm: LlmConfig,
    pub proxy: ProxyConfig,
    pub memory: MemoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// "production" or "development"
    pub environment: String,
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            environment: "production".to_string(),
            request_timeout_seconds: 60,
        }
    }
}

impl ServerConfig {
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// HMAC key for the session cookie. Required.
    pub secret_key: String,
    pub cookie_name: String,
    /// Absolute lifetime of a session in the store and of its cookie
    pub lifetime_seconds: u64,
    pub secure_cookie: bool,
    pub cleanup_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            cookie_name: "benbot_session".to_string(),
            lifetime_seconds: 86_400,
            secure_cookie: false,
            cleanup_interval_seconds: 600,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// Missing key keeps the server up; chat answers with the fallback reply
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: u32,
    /// Upper bound a client may request through `max_tokens`
    pub max_tokens_limit: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_seconds: 10,
            max_tokens: 500,
            max_tokens_limit: 1000,
            temperature: 0.7,
            top_p: 0.9,
            top_k: 40,
        }
    }
}

impl LlmConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProxyConfig {
    /// Plaintext proxy-list endpoints, queried in order
    pub sources: Vec<String>,
    pub cache_ttl_seconds: u64,
    pub max_entries: usize,
    pub source_timeout_seconds: u64,
    /// Echo endpoint used to probe a proxy
    pub probe_url: String,
    pub probe_timeout_seconds: u64,
    /// How many shuffled candidates `get_working_proxy` tries
    pub probe_limit: usize,
    pub ip_lookup_url: String,
    pub proxied_timeout_seconds: u64,
    pub direct_timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            sources: vec![
                "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http&timeout=5000&country=all&ssl=all&anonymity=all".to_string(),
                "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt".to_string(),
                "https://raw.githubusercontent.com/ShiftyTR/Proxy-List/master/http.txt".to_string(),
                "https://raw.githubusercontent.com/jetkai/proxy-list/main/online-proxies/txt/proxies-http.txt".to_string(),
            ],
            cache_ttl_seconds: 1800,
            max_entries: 50,
            source_timeout_seconds: 10,
            probe_url: "http://httpbin.org/ip".to_string(),
            probe_timeout_seconds: 3,
            probe_limit: 10,
            ip_lookup_url: "https://api.ipify.org?format=json".to_string(),
            proxied_timeout_seconds: 5,
            direct_timeout_seconds: 3,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

impl ProxyConfig {
    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_seconds as i64)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn proxied_timeout(&self) -> Duration {
        Duration::from_secs(self.proxied_timeout_seconds)
    }

    pub fn direct_timeout(&self) -> Duration {
        Duration::from_secs(self.direct_timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    /// Absolute lifetime of a conversation record
    pub record_ttl_seconds: u64,
    pub max_messages: usize,
    pub max_topics: usize,
    /// Messages handed to the model as context
    pub context_window: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            record_ttl_seconds: 86_400,
            max_messages: 50,
            max_topics: 10,
            context_window: 10,
        }
    }
}

impl MemoryConfig {
    pub fn record_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.record_ttl_seconds as i64)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    pub format: String,
    /// Directory for the daily rolling log file; `None` logs to stdout only
    pub directory: Option<String>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "pretty".to_string(),
            directory: Some("logs".to_string()),
            file_prefix: "benbot".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("proxy.sources"),
            );

        // Plain variables kept for deployments configured before the APP__ prefix
        if let Ok(secret) = std::env::var("SECRET_KEY") {
            builder = builder.set_override("session.secret_key", secret)?;
        }
        if let Some(key) = std::env::var("OPENAI_API_KEY")
            .ok()
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        {
            builder = builder.set_override("llm.api_key", key)?;
        }
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(env) = std::env::var("APP_ENV")
            .ok()
            .or_else(|| std::env::var("FLASK_ENV").ok())
        {
            builder = builder.set_override("server.environment", env)?;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            builder = builder.set_override("logging.format", format)?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.secret_key.trim().is_empty() {
            bail!("SECRET_KEY is not set (session.secret_key); refusing to start");
        }
        if self.proxy.max_entries == 0 {
            bail!("proxy.max_entries must be greater than zero");
        }
        if self.memory.max_messages == 0 || self.memory.max_topics == 0 {
            bail!("memory.max_messages and memory.max_topics must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.proxy.cache_ttl_seconds, 1800);
        assert_eq!(settings.proxy.max_entries, 50);
        assert_eq!(settings.proxy.probe_limit, 10);
        assert_eq!(settings.proxy.sources.len(), 4);
        assert_eq!(settings.memory.record_ttl_seconds, 86_400);
        assert_eq!(settings.memory.max_messages, 50);
        assert_eq!(settings.memory.max_topics, 10);
        assert!(!settings.llm.is_configured());
    }

    #[test]
    fn test_validate_requires_secret() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_err());

        settings.session.secret_key = "s3cr3t".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_blank_api_key_is_not_configured() {
        let llm = LlmConfig {
            api_key: Some("   ".to_string()),
            ..LlmConfig::default()
        };
        assert!(!llm.is_configured());
    }
}
