//! IdeaBot configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main IdeaBot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Telegram Bot API transport
    pub telegram: TelegramConfig,

    /// Project/task backend
    pub backend: BackendConfig,

    /// Text-generation provider
    pub llm: LlmConfig,

    /// Roadmap cache
    pub cache: CacheConfig,

    /// Progress animation
    pub progress: ProgressConfig,

    /// Per-user session workers
    pub session: SessionConfig,

    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local config: .ideabot.yml
        let local_config = PathBuf::from(".ideabot.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // User config: ~/.config/ideabot/ideabot.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are ignored here; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates: Vec<PathBuf> = match config_path {
            Some(path) => vec![path.clone()],
            None => {
                let mut paths = vec![PathBuf::from(".ideabot.yml")];
                paths.extend(Self::user_config_path());
                paths
            }
        };

        candidates
            .iter()
            .filter(|p| p.exists())
            .find_map(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ideabot").join("ideabot.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Environment variable containing the bot token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Bot API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Long-poll duration for getUpdates in seconds
    #[serde(rename = "poll-timeout-secs")]
    pub poll_timeout_secs: u64,

    /// HTTP request timeout in milliseconds (must exceed the poll timeout)
    #[serde(rename = "request-timeout-ms")]
    pub request_timeout_ms: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            base_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 30,
            request_timeout_ms: 40_000,
        }
    }
}

impl TelegramConfig {
    /// Read the bot token from the configured environment variable
    pub fn token(&self) -> Result<String> {
        std::env::var(&self.token_env)
            .map_err(|_| eyre::eyre!("Telegram bot token not found. Set the {} environment variable.", self.token_env))
    }
}

/// Where project and task data lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// In-process, memory-only store
    #[default]
    Local,
    /// Remote REST backend
    Http,
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub mode: BackendMode,

    /// REST backend base URL (http mode)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Read timeout in milliseconds; generation on the backend can be slow
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Connect timeout in milliseconds
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::Local,
            base_url: "http://backend:8000".to_string(),
            timeout_ms: 60_000,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Text-generation provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "stub" (generation disabled), "openai" or "anthropic"
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL (for openai, including the /v1 prefix)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "stub".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 800,
            temperature: 0.2,
            timeout_ms: 60_000,
        }
    }
}

impl LlmConfig {
    /// API key from the configured environment variable, if set
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }
}

/// Which cache store backs the roadmap memo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    #[default]
    Memory,
    File,
    None,
}

/// Roadmap cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub kind: CacheKind,

    /// Directory for the file cache
    pub dir: PathBuf,

    /// Entry lifetime in seconds
    #[serde(rename = "ttl-secs")]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        // XDG cache directory (~/.cache/ideabot on Linux)
        let dir = dirs::cache_dir()
            .map(|d| d.join("ideabot"))
            .unwrap_or_else(|| PathBuf::from(".ideabot-cache"));

        Self {
            kind: CacheKind::Memory,
            dir,
            ttl_secs: 3600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Progress animation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Delay between ticks in milliseconds
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,

    /// Smallest percent increment per tick
    #[serde(rename = "min-step")]
    pub min_step: u8,

    /// Largest percent increment per tick
    #[serde(rename = "max-step")]
    pub max_step: u8,

    /// Number of glyphs in the bar
    #[serde(rename = "bar-width")]
    pub bar_width: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            interval_ms: 400,
            min_step: 1,
            max_step: 3,
            bar_width: 12,
        }
    }
}

/// Session worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Retire a session worker after this many idle seconds
    #[serde(rename = "idle-timeout-secs")]
    pub idle_timeout_secs: u64,

    /// Pending events buffered per user
    #[serde(rename = "queue-depth")]
    pub queue_depth: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            queue_depth: 32,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}
