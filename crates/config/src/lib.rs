//! Configuration loading, validation, and management for CampusDesk.
//!
//! Loads configuration from `./campusdesk.toml` (or `~/.campusdesk/config.toml`)
//! with environment variable overrides. Validates all settings at startup.
//! The backend credential is required: [`AppConfig::require_api_key`] fails
//! fast so the server never starts with a non-functional backend client.

use campusdesk_core::provider::{GenerationConfig, SafetySetting};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the backend credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable selecting an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CAMPUSDESK_CONFIG";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "campusdesk.toml";

/// The root configuration structure.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend API key. `GEMINI_API_KEY` takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// LLM backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Conversation session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Knowledge base and system prompt sources
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
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
            .field("backend", &self.backend)
            .field("gateway", &self.gateway)
            .field("session", &self.session)
            .field("knowledge", &self.knowledge)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend kind. Only "gemini" is built in.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the backend base URL (proxies, tests)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default = "SafetySetting::defaults")]
    pub safety: Vec<SafetySetting>,

    /// Per-attempt timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt, transient errors only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff, doubled after every retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash".into()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: default_model(),
            generation: GenerationConfig::default(),
            safety: SafetySetting::defaults(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_body_limit() -> usize {
    64 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            body_limit: default_body_limit(),
        }
    }
}

/// How requests are mapped onto conversation sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// One process-wide session shared by every caller.
    #[default]
    Shared,
    /// One session per caller-supplied session id.
    PerClient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub mode: SessionMode,

    /// Cap on concurrently tracked sessions (per_client mode)
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Most recent turns replayed to the backend. 0 = full history.
    #[serde(default)]
    pub max_history_turns: usize,
}

fn default_max_sessions() -> usize {
    1_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::default(),
            max_sessions: default_max_sessions(),
            max_history_turns: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Knowledge base TOML document. The embedded default is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Replace the built-in system instruction with the contents of this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_path: Option<String>,
}

impl AppConfig {
    /// Load configuration from the resolved path, then apply environment
    /// overrides:
    /// - `GEMINI_API_KEY` (credential)
    /// - `CAMPUSDESK_MODEL`
    /// - `CAMPUSDESK_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::resolve_path(|k| std::env::var(k).ok());
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|k| std::env::var(k).ok())?;
        Ok(config)
    }

    /// Pick the config file: `CAMPUSDESK_CONFIG`, then `./campusdesk.toml`,
    /// then `~/.campusdesk/config.toml`.
    pub fn resolve_path(env: impl Fn(&str) -> Option<String>) -> PathBuf {
        if let Some(explicit) = env(CONFIG_PATH_ENV) {
            return PathBuf::from(explicit);
        }
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return local;
        }
        Self::config_dir().join("config.toml")
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

    /// Apply environment overrides through `env`, then re-validate.
    pub fn apply_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(key) = env(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }

        if let Some(model) = env("CAMPUSDESK_MODEL") {
            self.backend.model = model;
        }

        if let Some(port) = env("CAMPUSDESK_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("CAMPUSDESK_PORT is not a valid port: {port}"))
            })?;
        }

        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".campusdesk")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let generation = &self.backend.generation;
        if !(0.0..=2.0).contains(&generation.temperature) {
            return Err(ConfigError::ValidationError(
                "backend.generation.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&generation.top_p) {
            return Err(ConfigError::ValidationError(
                "backend.generation.top_p must be between 0.0 and 1.0".into(),
            ));
        }

        if generation.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "backend.generation.top_k must be at least 1".into(),
            ));
        }

        if generation.max_output_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "backend.generation.max_output_tokens must be at least 1".into(),
            ));
        }

        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "backend.timeout_secs must be at least 1".into(),
            ));
        }

        if self.session.max_sessions == 0 {
            return Err(ConfigError::ValidationError(
                "session.max_sessions must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// The backend credential, or [`ConfigError::MissingApiKey`].
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.require_api_key().is_ok()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
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

    #[error("No backend API key configured: set GEMINI_API_KEY in the environment or .env file")]
    MissingApiKey,
}
