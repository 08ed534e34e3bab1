use std::time::Duration;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GROQ API key not found in environment variables")]
    MissingApiKey,
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

// ── Config ───────────────────────────────────────────────────────────────────

/// Process-wide settings, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub groq_api_key: String,
    pub groq_api_url: String,
    pub groq_model: String,
    pub bind_addr: String,
    pub fetch_timeout: Duration,
    pub user_agent: String,
}

impl AppConfig {
    /// Builds the config with defaults for everything but the API key.
    pub fn new(groq_api_key: impl Into<String>) -> Self {
        Self {
            groq_api_key: groq_api_key.into(),
            groq_api_url: DEFAULT_GROQ_API_URL.to_string(),
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("GROQ_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let mut config = Self::new(api_key);

        if let Some(url) = lookup("GROQ_API_URL") {
            config.groq_api_url = url;
        }
        if let Some(model) = lookup("GROQ_MODEL") {
            config.groq_model = model;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(raw) = lookup("FETCH_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "FETCH_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
            config.fetch_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
