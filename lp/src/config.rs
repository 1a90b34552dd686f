//! lakeplan configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main lakeplan configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// HTTP service configuration
    pub server: ServerConfig,

    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Task store configuration
    pub storage: StorageConfig,

    /// Planning worker pool
    pub worker: WorkerConfig,

    /// Warehouse access during planning
    pub warehouse: WarehouseConfig,

    /// Prompt template overrides
    pub prompts: PromptsConfig,
}

impl Config {
    /// Validate configuration before serving
    ///
    /// Checks that the API token resolves and that limits are usable.
    pub fn validate(&self) -> Result<()> {
        self.server.resolve_api_token()?;

        if self.server.poll_interval_ms == 0 {
            return Err(eyre::eyre!("server.poll-interval-ms must be greater than zero"));
        }
        if self.worker.max_concurrent == 0 {
            return Err(eyre::eyre!("worker.max-concurrent must be greater than zero"));
        }
        match self.llm.provider.as_str() {
            "ollama" | "openai" | "none" => Ok(()),
            other => Err(eyre::eyre!(
                "Unknown LLM provider '{}'. Supported: ollama, openai, none",
                other
            )),
        }
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .lakeplan.yml
        let local_config = PathBuf::from(".lakeplan.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/lakeplan/lakeplan.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("lakeplan").join("lakeplan.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// HTTP service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind: String,

    /// Environment variable holding the shared API token
    #[serde(rename = "api-token-env")]
    pub api_token_env: String,

    /// Inline API token, used when the environment variable is unset
    #[serde(rename = "api-token")]
    pub api_token: Option<String>,

    /// Upper bound for one long-poll status call
    #[serde(rename = "max-status-longpoll-secs")]
    pub max_status_longpoll_secs: u64,

    /// Interval between completion checks while long-polling
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            api_token_env: "API_TOKEN".to_string(),
            api_token: None,
            max_status_longpoll_secs: 1200,
            poll_interval_ms: 1000,
        }
    }
}

impl ServerConfig {
    /// Token from the configured environment variable, else the inline token
    pub fn resolve_api_token(&self) -> Result<String> {
        if let Some(token) = std::env::var(&self.api_token_env).ok().filter(|t| !t.is_empty()) {
            return Ok(token);
        }
        match self.api_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(eyre::eyre!(
                "API token not found. Set the {} environment variable or server.api-token.",
                self.api_token_env
            )),
        }
    }

    pub fn max_longpoll(&self) -> Duration {
        Duration::from_secs(self.max_status_longpoll_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "ollama", "openai" or "none"
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key (openai only)
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL, provider default when unset
    #[serde(rename = "base-url")]
    pub base_url: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "qwen2:7b".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            max_tokens: 4096,
            timeout_ms: 120_000,
            temperature: 0.2,
        }
    }
}

impl LlmConfig {
    /// Configured base URL or the provider's default, without trailing slash
    pub fn resolved_base_url(&self) -> String {
        let url = match (&self.base_url, self.provider.as_str()) {
            (Some(url), _) => url.as_str(),
            (None, "openai") => "https://api.openai.com",
            (None, _) => "http://localhost:11434",
        };
        url.trim_end_matches('/').to_string()
    }

    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .map_err(|_| eyre::eyre!("LLM API key not found. Set the {} environment variable.", self.api_key_env))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Task store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Store directory, defaults to `<data dir>/lakeplan`
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn store_dir(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lakeplan")
        })
    }
}

/// Planning worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Planning runs allowed at once
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Warehouse access configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// Sample source row counts for the advisor prompt
    #[serde(rename = "sample-row-counts")]
    pub sample_row_counts: bool,

    /// Timeout for each warehouse HTTP request
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            sample_row_counts: false,
            timeout_ms: 30_000,
        }
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory holding `<name>.pmt` overrides
    pub dir: Option<PathBuf>,
}
