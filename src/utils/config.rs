use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Keys per prompt unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub translation: TranslationDefaults,
    pub api: ApiConfig,
    pub checkpoint: CheckpointConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationDefaults {
    pub target_language: Option<String>,
    pub batch_size: usize,
    pub pacing_interval_ms: u64,
    pub max_prompt_tokens: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub max_tokens: usize,
    pub temperature: f32,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "locale-fill".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            translation: TranslationDefaults {
                target_language: None,
                batch_size: DEFAULT_BATCH_SIZE,
                pacing_interval_ms: 15_000,
                max_prompt_tokens: 4_000,
            },
            api: ApiConfig {
                endpoint: "https://api.anthropic.com/v1/messages".to_string(),
                model: "claude-3-5-sonnet-20241022".to_string(),
                timeout_seconds: 120,
                max_tokens: 1000,
                temperature: 0.3,
                api_key_env: "ANTHROPIC_API_KEY".to_string(),
            },
            checkpoint: CheckpointConfig {
                db_path: PathBuf::from("./data/checkpoints.redb"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> crate::utils::errors::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::utils::errors::LocaleFillError::ConfigError(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> crate::utils::errors::Result<Self> {
        toml::from_str(content)
            .map_err(|e| crate::utils::errors::LocaleFillError::ConfigError(e.to_string()))
    }

    pub fn load_or_default(path: Option<&str>) -> Self {
        if let Some(p) = path {
            Self::load_from_file(p).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Session defaults derived from the file config; the API key is read from
    /// the configured environment variable and may be empty.
    pub fn session_config(&self, target_language: &str) -> TranslationSessionConfig {
        TranslationSessionConfig {
            target_language: target_language.to_string(),
            batch_size: self.translation.batch_size,
            pacing_interval_ms: self.translation.pacing_interval_ms,
            api_endpoint: self.api.endpoint.clone(),
            api_key: std::env::var(&self.api.api_key_env).unwrap_or_default(),
            model: self.api.model.clone(),
            max_tokens: self.api.max_tokens,
            temperature: self.api.temperature,
            timeout_seconds: self.api.timeout_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationSessionConfig {
    pub target_language: String,
    pub batch_size: usize,
    pub pacing_interval_ms: u64,
    pub api_endpoint: String,
    #[serde(skip_serializing, default)]
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for TranslationSessionConfig {
    fn default() -> Self {
        AppConfig::default().session_config("")
    }
}

impl TranslationSessionConfig {
    pub fn batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
