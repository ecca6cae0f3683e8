//! Configuration loading and validation for the Atelier engine.
//!
//! Loads engine settings from a TOML document (the studio persists it in
//! its own settings storage) with environment variable overrides, and
//! validates everything before a run starts.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// The root configuration structure for the engine.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the configured provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Shell tool settings
    #[serde(default)]
    pub shell: ShellConfig,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "api_key",
                &self.api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("shell", &self.shell)
            .finish()
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum model turns per run.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Retry policy for transient provider errors.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_max_steps() -> u32 {
    25
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    1000
}
fn default_max_delay_ms() -> u64 {
    30000
}
fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

/// Shell tool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Output larger than this is truncated before being fed to the model.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_max_output_bytes() -> usize {
    64 * 1024
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: default_max_output_bytes(),
        }
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
            agent: AgentConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Parse configuration from a TOML string, then apply environment
    /// overrides (`ATELIER_MODEL`) and validate.
    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig = toml::from_str(raw)?;
        if let Ok(model) = std::env::var("ATELIER_MODEL") {
            if !model.trim().is_empty() {
                config.default_model = model;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Validate all settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_model.trim().is_empty() {
            return Err(ConfigError::Invalid("default_model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::Invalid(format!(
                "default_temperature {} out of range [0.0, 2.0]",
                self.default_temperature
            )));
        }
        if self.agent.max_steps == 0 {
            return Err(ConfigError::Invalid("agent.max_steps must be >= 1".into()));
        }
        if self.agent.retry.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "agent.retry.multiplier must be >= 1.0".into(),
            ));
        }
        if self.agent.retry.max_delay_ms < self.agent.retry.base_delay_ms {
            return Err(ConfigError::Invalid(
                "agent.retry.max_delay_ms must be >= base_delay_ms".into(),
            ));
        }
        if self.api_key.is_none() {
            warn!("no api_key configured; the provider client must supply its own credentials");
        }
        Ok(())
    }
}
