use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::HerdError;

/// Default completion endpoint (Perplexity chat completions).
pub const DEFAULT_COMPLETION_ENDPOINT: &str = "https://api.perplexity.ai/chat/completions";

/// Environment variable holding the completion provider credential.
pub const API_KEY_ENV: &str = "PERPLEXITY_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct HerdConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8780,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// Trailing window for the AMU chart, in days.
    pub window_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self { window_days: 365 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InsightsConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub max_attempts: usize,
    /// Upper bound for a single completion attempt, in milliseconds.
    pub request_timeout_ms: u64,
    /// Pinned credential. When absent the key is read from `PERPLEXITY_API_KEY`
    /// on every call.
    pub api_key: Option<String>,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COMPLETION_ENDPOINT.to_string(),
            model: "sonar".to_string(),
            max_tokens: 1500,
            temperature: 0.7,
            max_attempts: 3,
            request_timeout_ms: 60_000,
            api_key: None,
        }
    }
}

/// Longest accepted analytics window (100 years).
pub const MAX_WINDOW_DAYS: u32 = 36_500;

impl HerdConfig {
    pub fn load(path: &str) -> Result<Self, HerdError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("HERD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: HerdConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HerdError> {
        if self.analytics.window_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::Message(format!(
                "analytics.window_days must be at most {}, got {}",
                MAX_WINDOW_DAYS, self.analytics.window_days
            ))
            .into());
        }
        Ok(())
    }
}
