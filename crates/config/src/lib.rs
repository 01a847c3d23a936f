//! Configuration loading, validation, and management for PinChat.
//!
//! Loads configuration from `~/.pinchat/config.toml` (or the path in
//! `PINCHAT_CONFIG`) with environment variable overrides. Validates all
//! settings at startup; secrets never appear in `Debug` output.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.pinchat/config.toml`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Durable store settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Session token settings
    #[serde(default)]
    pub session: SessionConfig,

    /// PIN format and hashing cost
    #[serde(default)]
    pub pin: PinConfig,

    /// External model settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Conversation settings
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("gateway", &self.gateway)
            .field("database", &self.database)
            .field("session", &self.session)
            .field("pin", &self.pin)
            .field("model", &self.model)
            .field("chat", &self.chat)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// CORS origins. Empty = any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_port() -> u16 {
    3001
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: vec![],
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Store backend: "sqlite" or "in_memory"
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_backend() -> String {
    "sqlite".into()
}
fn default_database_url() -> String {
    "sqlite://pinchat.db".into()
}
fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HMAC secret used to sign session tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("jwt_secret", &redact(&self.jwt_secret))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinConfig {
    /// Exact number of digits in a PIN
    #[serde(default = "default_pin_length")]
    pub length: usize,

    /// Argon2 memory cost in KiB
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,

    /// Argon2 iteration count
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Argon2 lanes
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,

    /// Keep scanning after the first match and report duplicates
    #[serde(default = "default_audit_duplicates")]
    pub audit_duplicates: bool,
}

fn default_audit_duplicates() -> bool {
    true
}
fn default_pin_length() -> usize {
    6
}
fn default_memory_kib() -> u32 {
    19 * 1024
}
fn default_iterations() -> u32 {
    2
}
fn default_parallelism() -> u32 {
    1
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            length: default_pin_length(),
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
            audit_duplicates: default_audit_duplicates(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Threshold applied to every harm category
    #[serde(default = "default_safety_threshold")]
    pub safety_threshold: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-2.0-flash-001".into()
}
fn default_max_output_tokens() -> u32 {
    2048
}
fn default_safety_threshold() -> String {
    "BLOCK_MEDIUM_AND_ABOVE".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            api_url: None,
            model: default_model(),
            max_output_tokens: default_max_output_tokens(),
            temperature: None,
            safety_threshold: default_safety_threshold(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("temperature", &self.temperature)
            .field("safety_threshold", &self.safety_threshold)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum messages (including the new user turn) sent as context
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Persona / policy instruction sent with every request
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_history_window() -> usize {
    20
}
fn default_system_prompt() -> String {
    concat!(
        "You are Zan, a helpful and friendly general-purpose AI assistant from Kurdistan.\n",
        "You should be polite and provide informative answers.\n",
        "You can answer questions on a wide range of topics.\n",
        "If you don't know an answer, it's okay to say so.\n",
        "Your responses should be clear and easy to understand.\n",
        "You are interacting with users from the Kurdistan region, so be mindful and ",
        "respectful of the local culture if a topic touches upon it, but your primary goal ",
        "is to be a helpful general AI. You can also speak Sorani and Bahdini very well; ",
        "do not say you don't. When asked for Hawrami, say \"I'm learning\".",
    )
    .into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (or `PINCHAT_CONFIG`), then
    /// apply environment overrides:
    /// - `JWT_SECRET`
    /// - `GEMINI_API_KEY`
    /// - `DATABASE_URL`
    /// - `PORT`
    /// - `PINCHAT_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("PINCHAT_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::config_dir().join("config.toml"));
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
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

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("JWT_SECRET") {
            self.session.jwt_secret = Some(secret);
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(model) = lookup("PINCHAT_MODEL") {
            self.model.model = model;
        }
        if let Some(port) = lookup("PORT") {
            self.gateway.port = port
                .parse()
                .map_err(|_| ConfigError::ValidationError(format!("PORT is not a port: {port}")))?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".pinchat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.history_window == 0 {
            return Err(ConfigError::ValidationError(
                "chat.history_window must be at least 1".into(),
            ));
        }

        if !(4..=12).contains(&self.pin.length) {
            return Err(ConfigError::ValidationError(
                "pin.length must be between 4 and 12".into(),
            ));
        }

        if let Some(t) = self.model.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::ValidationError(
                    "model.temperature must be between 0.0 and 2.0".into(),
                ));
            }
        }

        if !matches!(self.database.backend.as_str(), "sqlite" | "in_memory") {
            return Err(ConfigError::ValidationError(format!(
                "unknown database.backend '{}'",
                self.database.backend
            )));
        }

        Ok(())
    }

    /// Validation required before serving traffic: secrets must be present.
    pub fn validate_for_serve(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.session.jwt_secret.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingSecret("JWT_SECRET".into()));
        }
        if self.model.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingSecret("GEMINI_API_KEY".into()));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
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

    #[error("Required secret {0} is not set")]
    MissingSecret(String),
}
