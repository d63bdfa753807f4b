//! Configuration loading, validation, and management for the affinity engine.
//!
//! Loads configuration from `~/.affinity/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use affinity_core::level::{MAX_SCORE, MIN_SCORE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The apology sent when the final generation fails.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "Sorry, I got a little lost in thought just now. Could you say that again?";

/// The root configuration structure.
///
/// Maps directly to `~/.affinity/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature for the reply generation
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per reply
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Providers tried in order after the default one fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_providers: Vec<String>,

    #[serde(default)]
    pub companion: CompanionConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub protector: ProtectorConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub prompt: PromptConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.8
}
fn default_max_tokens() -> u32 {
    512
}
fn default_true() -> bool {
    true
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("companion", &self.companion)
            .field("engine", &self.engine)
            .field("protector", &self.protector)
            .field("memory", &self.memory)
            .field("prompt", &self.prompt)
            .field("fallback_providers", &self.fallback_providers)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Who the user is talking to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionConfig {
    /// Stable id used in relationship keys
    #[serde(default = "default_companion_id")]
    pub id: String,

    /// Display name
    #[serde(default = "default_companion_name")]
    pub name: String,

    /// Free-text persona prepended to the identity section
    #[serde(default = "default_persona")]
    pub persona: String,
}

fn default_companion_id() -> String {
    "aria".into()
}
fn default_companion_name() -> String {
    "Aria".into()
}
fn default_persona() -> String {
    "A warm, curious companion who enjoys books, music, and long conversations.".into()
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            id: default_companion_id(),
            name: default_companion_name(),
            persona: default_persona(),
        }
    }
}

/// Which prompt pipeline a turn runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStrategy {
    /// Expression synthesis, then budgeted section composition
    #[default]
    Flow,
    /// One compact instruction block
    Classic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub pipeline: PipelineStrategy,

    /// Attach the debug payload to every turn response
    #[serde(default)]
    pub debug: bool,

    /// How many recent working-memory messages go into the reply request
    #[serde(default = "default_history_messages")]
    pub history_messages: usize,

    #[serde(default = "default_analysis_timeout")]
    pub analysis_timeout_secs: u64,

    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,

    #[serde(default = "default_analysis_temperature")]
    pub analysis_temperature: f32,

    /// Run the fact extractor after each successful reply
    #[serde(default = "default_true")]
    pub extract_facts: bool,

    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

fn default_history_messages() -> usize {
    6
}
fn default_analysis_timeout() -> u64 {
    20
}
fn default_generation_timeout() -> u64 {
    60
}
fn default_analysis_temperature() -> f32 {
    0.2
}
fn default_fallback_reply() -> String {
    DEFAULT_FALLBACK_REPLY.into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineStrategy::default(),
            debug: false,
            history_messages: default_history_messages(),
            analysis_timeout_secs: default_analysis_timeout(),
            generation_timeout_secs: default_generation_timeout(),
            analysis_temperature: default_analysis_temperature(),
            extract_facts: true,
            fallback_reply: default_fallback_reply(),
        }
    }
}

/// Tuning of the affinity change protector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectorConfig {
    /// Largest positive change per turn
    #[serde(default = "default_max_increase")]
    pub max_increase: i32,

    /// Largest negative change per turn, as a positive number
    #[serde(default = "default_max_decrease")]
    pub max_decrease: i32,

    #[serde(default = "default_safe_min")]
    pub safe_min: i32,

    #[serde(default = "default_safe_max")]
    pub safe_max: i32,

    /// Recent changes remembered per relationship
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_rapid_window")]
    pub rapid_window_secs: u64,

    /// Sum of |delta| inside the window that triggers dampening
    #[serde(default = "default_rapid_threshold")]
    pub rapid_threshold: i32,

    #[serde(default = "default_low_score_threshold")]
    pub low_score_threshold: i32,

    #[serde(default = "default_high_score_threshold")]
    pub high_score_threshold: i32,

    /// Upper bound (exclusive) of the early acceleration zone
    #[serde(default = "default_acceleration_ceiling")]
    pub acceleration_ceiling: i32,

    #[serde(default = "default_low_recovery")]
    pub low_score_recovery: f64,

    #[serde(default = "default_low_protection")]
    pub low_score_protection: f64,

    #[serde(default = "default_high_deceleration")]
    pub high_score_deceleration: f64,

    #[serde(default = "default_acceleration")]
    pub acceleration: f64,

    /// Pay bonuses when the interaction count crosses a milestone
    #[serde(default = "default_true")]
    pub milestone_bonuses: bool,
}

fn default_max_increase() -> i32 {
    50
}
fn default_max_decrease() -> i32 {
    30
}
fn default_safe_min() -> i32 {
    0
}
fn default_safe_max() -> i32 {
    1000
}
fn default_history_capacity() -> usize {
    20
}
fn default_rapid_window() -> u64 {
    300
}
fn default_rapid_threshold() -> i32 {
    100
}
fn default_low_score_threshold() -> i32 {
    50
}
fn default_high_score_threshold() -> i32 {
    950
}
fn default_acceleration_ceiling() -> i32 {
    250
}
fn default_low_recovery() -> f64 {
    1.2
}
fn default_low_protection() -> f64 {
    0.4
}
fn default_high_deceleration() -> f64 {
    0.7
}
fn default_acceleration() -> f64 {
    1.3
}

impl Default for ProtectorConfig {
    fn default() -> Self {
        Self {
            max_increase: default_max_increase(),
            max_decrease: default_max_decrease(),
            safe_min: default_safe_min(),
            safe_max: default_safe_max(),
            history_capacity: default_history_capacity(),
            rapid_window_secs: default_rapid_window(),
            rapid_threshold: default_rapid_threshold(),
            low_score_threshold: default_low_score_threshold(),
            high_score_threshold: default_high_score_threshold(),
            acceleration_ceiling: default_acceleration_ceiling(),
            low_score_recovery: default_low_recovery(),
            low_score_protection: default_low_protection(),
            high_score_deceleration: default_high_deceleration(),
            acceleration: default_acceleration(),
            milestone_bonuses: true,
        }
    }
}

/// Storage backend for episodic memory, facts, and the durable mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackendKind {
    #[default]
    Sqlite,
    InMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub backend: MemoryBackendKind,

    /// SQLite file; defaults to `~/.affinity/affinity.db`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,

    /// Messages kept per working-memory session
    #[serde(default = "default_working_capacity")]
    pub working_capacity: usize,

    #[serde(default = "default_idle_ttl")]
    pub idle_ttl_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Per-tier retrieval timeout
    #[serde(default = "default_tier_timeout")]
    pub tier_timeout_ms: u64,

    #[serde(default = "default_episodic_top_k")]
    pub episodic_top_k: usize,
}

fn default_working_capacity() -> usize {
    10
}
fn default_idle_ttl() -> u64 {
    7200
}
fn default_sweep_interval() -> u64 {
    3600
}
fn default_tier_timeout() -> u64 {
    1500
}
fn default_episodic_top_k() -> usize {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: MemoryBackendKind::default(),
            database_path: None,
            working_capacity: default_working_capacity(),
            idle_ttl_secs: default_idle_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            tier_timeout_ms: default_tier_timeout(),
            episodic_top_k: default_episodic_top_k(),
        }
    }
}

impl MemoryConfig {
    /// The configured database path, or the default under the config dir.
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| AppConfig::config_dir().join("affinity.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Character budget of the composed system prompt
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

fn default_max_chars() -> usize {
    2000
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.affinity/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `AFFINITY_API_KEY` (highest priority)
    /// - `OPENROUTER_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("AFFINITY_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("AFFINITY_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("AFFINITY_MODEL") {
            config.default_model = model;
        }

        if let Ok(debug) = std::env::var("AFFINITY_DEBUG") {
            config.engine.debug = parse_flag(&debug);
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".affinity")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let p = &self.protector;
        if p.max_increase <= 0 || p.max_decrease <= 0 {
            return Err(ConfigError::ValidationError(
                "protector max_increase and max_decrease must be > 0".into(),
            ));
        }
        if p.safe_min >= p.safe_max {
            return Err(ConfigError::ValidationError(
                "protector safe_min must be below safe_max".into(),
            ));
        }
        if p.safe_min < MIN_SCORE || p.safe_max > MAX_SCORE {
            return Err(ConfigError::ValidationError(format!(
                "protector safe_min and safe_max must lie within {MIN_SCORE}..={MAX_SCORE}"
            )));
        }
        let multipliers = [
            p.low_score_recovery,
            p.low_score_protection,
            p.high_score_deceleration,
            p.acceleration,
        ];
        if multipliers.iter().any(|m| !m.is_finite() || *m < 0.0) {
            return Err(ConfigError::ValidationError(
                "protector multipliers must be finite and >= 0".into(),
            ));
        }
        if p.history_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "protector history_capacity must be >= 1".into(),
            ));
        }

        if self.memory.working_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "memory working_capacity must be >= 1".into(),
            ));
        }

        if self.prompt.max_chars == 0 {
            return Err(ConfigError::ValidationError("prompt max_chars must be > 0".into()));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            companion: CompanionConfig::default(),
            engine: EngineConfig::default(),
            protector: ProtectorConfig::default(),
            memory: MemoryConfig::default(),
            prompt: PromptConfig::default(),
            fallback_providers: Vec::new(),
            providers: HashMap::new(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
