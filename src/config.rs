use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Configuration for the lecture segmenter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// External indexing service connection
    pub service: ServiceConfig,

    /// Index that receives lecture videos
    pub index: IndexSettings,

    /// Task polling and retry behaviour
    pub polling: PollingConfig,

    /// Segment normalization settings
    pub segmentation: SegmentationConfig,

    /// HTTP server settings
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the indexing API
    pub base_url: String,

    /// API key for the indexing service
    pub api_key: Option<String>,

    /// Timeout for a single request (seconds)
    pub timeout_seconds: u64,

    /// Connection timeout (seconds)
    pub connect_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Name of the index to resolve or create
    pub name: String,

    /// Models the index must be configured with
    pub engines: Vec<EngineConfig>,
}

/// A model and the modalities it must be enabled for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub model: String,
    pub options: Vec<String>,
}

impl EngineConfig {
    pub fn new(model: &str, options: &[&str]) -> Self {
        Self {
            model: model.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    /// Capability tags in `model:option` form
    pub fn capability_tags(&self) -> impl Iterator<Item = String> + '_ {
        self.options
            .iter()
            .map(move |option| format!("{}:{}", self.model, option))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between status queries (seconds)
    pub interval_seconds: u64,

    /// Maximum wall-clock wait for a terminal state (seconds)
    pub max_wait_seconds: u64,

    /// Retries for a single failed status query
    pub max_transient_retries: u32,

    /// Base delay between retries (milliseconds), doubles on each retry
    pub retry_base_delay_ms: u64,

    /// Upper bound for a single retry delay (milliseconds)
    pub retry_max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Titles longer than this are truncated (characters)
    pub max_title_chars: usize,

    /// Overlap tolerated between adjacent segments (seconds)
    pub overlap_epsilon_seconds: f64,

    /// Free-text prompt used when the chapter query yields nothing
    pub topic_prompt: String,

    /// Issue the free-text prompt as a second query
    pub enable_prompt_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.twelvelabs.io/v1.3".to_string(),
            api_key: None,
            timeout_seconds: 30,
            connect_timeout_seconds: 10,
        }
    }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            name: "lecture-segments".to_string(),
            engines: vec![
                EngineConfig::new("marengo2.7", &["visual", "audio"]),
                EngineConfig::new("pegasus1.2", &["visual", "audio"]),
            ],
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            max_wait_seconds: 1800, // 30 minutes for long lectures
            max_transient_retries: 3,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 8000,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_title_chars: 120,
            overlap_epsilon_seconds: 0.01,
            topic_prompt: "Split this lecture into its main topics. Return a JSON array where each \
                element has \"title\", \"start\" and \"end\" fields; start and end are timestamps \
                in seconds or mm:ss."
                .to_string(),
            enable_prompt_fallback: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            log_level: "info".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            index: IndexSettings::default(),
            polling: PollingConfig::default(),
            segmentation: SegmentationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl IndexSettings {
    /// All capability tags the index must provide
    pub fn required_capabilities(&self) -> BTreeSet<String> {
        self.engines
            .iter()
            .flat_map(|engine| engine.capability_tags())
            .collect()
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_seconds)
    }

    /// Exponential backoff for the given retry attempt (1-based), capped
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .retry_base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.retry_max_delay_ms);
        Duration::from_millis(delay)
    }
}

impl Config {
    /// Load configuration from the first config file found, then apply env overrides.
    ///
    /// A config file that exists but cannot be parsed is an error, never a
    /// silent fallback to defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            Path::new("lecture-segmenter.toml"),
            Path::new("config/lecture-segmenter.toml"),
            Path::new("/etc/lecture-segmenter/config.toml"),
        ];
        Self::load_from_candidates(&config_paths)
    }

    fn load_from_candidates(candidates: &[&Path]) -> Result<Self> {
        match candidates.iter().find(|path| path.is_file()) {
            Some(path) => {
                let config = Self::from_file(path)?;
                tracing::info!("📄 Loaded configuration from: {}", path.display());
                Ok(config)
            }
            None => {
                tracing::info!("No config file found, using defaults and environment");
                Ok(Self::from_env())
            }
        }
    }

    /// Load configuration from an explicit file, then apply env overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.apply_env();
        Ok(config)
    }

    /// Configuration from defaults and environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(api_key) = std::env::var("TWELVELABS_API_KEY") {
            self.service.api_key = Some(api_key);
        }

        if let Ok(base_url) = std::env::var("TWELVELABS_BASE_URL") {
            self.service.base_url = base_url;
        }

        if let Ok(name) = std::env::var("SEGMENTER_INDEX_NAME") {
            self.index.name = name;
        }

        if let Ok(port) = std::env::var("SEGMENTER_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid SEGMENTER_PORT: {}", port),
            }
        }

        if let Ok(log_level) = std::env::var("SEGMENTER_LOG_LEVEL") {
            self.server.log_level = log_level;
        }
    }

    /// Validate configuration; a missing credential is fatal
    pub fn validate(&self) -> Result<()> {
        match self.service.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {}
            _ => return Err(anyhow!("Missing TWELVELABS_API_KEY: an API key is required")),
        }

        if url::Url::parse(&self.service.base_url).is_err() {
            return Err(anyhow!("service.base_url is not a valid URL: {}", self.service.base_url));
        }

        if self.index.name.trim().is_empty() {
            return Err(anyhow!("index.name must not be empty"));
        }

        if self.index.engines.is_empty() {
            return Err(anyhow!("index.engines must list at least one model"));
        }

        if self.polling.interval_seconds == 0 {
            return Err(anyhow!("polling.interval_seconds must be greater than 0"));
        }

        if self.polling.max_wait_seconds < self.polling.interval_seconds {
            return Err(anyhow!("polling.max_wait_seconds must be at least interval_seconds"));
        }

        if self.segmentation.max_title_chars == 0 {
            return Err(anyhow!("segmentation.max_title_chars must be greater than 0"));
        }

        if !(self.segmentation.overlap_epsilon_seconds >= 0.0) {
            return Err(anyhow!("segmentation.overlap_epsilon_seconds must not be negative"));
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Lecture Segmenter Configuration:\n\
            - Service: {}\n\
            - Index: {}\n\
            - Engines: {}\n\
            - Poll Interval: {}s (max wait {}s)\n\
            - Listen: {}:{}",
            self.service.base_url,
            self.index.name,
            self.index
                .engines
                .iter()
                .map(|e| e.model.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            self.polling.interval_seconds,
            self.polling.max_wait_seconds,
            self.server.host,
            self.server.port
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.service.api_key = Some(api_key.to_string());
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.service.base_url = base_url.to_string();
        self
    }

    pub fn with_index_name(mut self, name: &str) -> Self {
        self.config.index.name = name.to_string();
        self
    }

    pub fn with_engines(mut self, engines: Vec<EngineConfig>) -> Self {
        self.config.index.engines = engines;
        self
    }

    pub fn with_poll_interval(mut self, seconds: u64) -> Self {
        self.config.polling.interval_seconds = seconds;
        self
    }

    pub fn with_max_wait(mut self, seconds: u64) -> Self {
        self.config.polling.max_wait_seconds = seconds;
        self
    }

    pub fn with_transient_retries(mut self, retries: u32) -> Self {
        self.config.polling.max_transient_retries = retries;
        self
    }

    pub fn with_prompt_fallback(mut self, enable: bool) -> Self {
        self.config.segmentation.enable_prompt_fallback = enable;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
