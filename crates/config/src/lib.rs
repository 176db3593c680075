//! Configuration loading, validation, and management for BizCanvas.
//!
//! Loads configuration from a TOML file with environment variable overrides.
//! Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider API key (usually supplied via `GROQ_API_KEY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the chat-completions endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model used by the generation node
    #[serde(default = "default_model")]
    pub model: String,

    /// Smaller model used by the summarization node
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Temperature for generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per generated reply
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Workflow thresholds
    #[serde(default)]
    pub workflow: WorkflowConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_api_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_model() -> String {
    "llama-3.3-70b-versatile".into()
}
fn default_summary_model() -> String {
    "llama-3.1-8b-instant".into()
}
fn default_temperature() -> f32 {
    0.7
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("summary_model", &self.summary_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("workflow", &self.workflow)
            .field("gateway", &self.gateway)
            .finish()
    }
}

/// Thresholds driving the conversation workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Message count above which the compaction node runs
    #[serde(default = "default_summary_trigger")]
    pub summary_trigger: usize,

    /// Messages retained after a compaction prune
    #[serde(default = "default_keep_after_summary")]
    pub keep_after_summary: usize,

    /// Maximum decoded attachment payload size in bytes
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: usize,
}

fn default_summary_trigger() -> usize {
    14
}
fn default_keep_after_summary() -> usize {
    5
}
fn default_max_attachment_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            summary_trigger: default_summary_trigger(),
            keep_after_summary: default_keep_after_summary(),
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8000
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:8080".into(),
        "http://127.0.0.1:8080".into(),
    ]
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file path plus environment overrides.
    ///
    /// Environment variables:
    /// - `GROQ_API_KEY` / `BIZCANVAS_API_KEY` — provider credential
    /// - `BIZCANVAS_MODEL` — generation model override
    /// - `BIZCANVAS_SUMMARY_MODEL` — summarization model override
    /// - `BIZCANVAS_PORT` — gateway port override
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::default(),
        };

        if config.api_key.is_none() {
            config.api_key = std::env::var("BIZCANVAS_API_KEY")
                .ok()
                .or_else(|| std::env::var("GROQ_API_KEY").ok());
        }

        if let Ok(model) = std::env::var("BIZCANVAS_MODEL") {
            config.model = model;
        }

        if let Ok(model) = std::env::var("BIZCANVAS_SUMMARY_MODEL") {
            config.summary_model = model;
        }

        if let Ok(port) = std::env::var("BIZCANVAS_PORT")
            && let Ok(port) = port.parse()
        {
            config.gateway.port = port;
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

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.workflow.summary_trigger == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.summary_trigger must be at least 1".into(),
            ));
        }

        if self.workflow.keep_after_summary >= self.workflow.summary_trigger {
            return Err(ConfigError::ValidationError(
                "workflow.keep_after_summary must be below workflow.summary_trigger".into(),
            ));
        }

        if self.workflow.max_attachment_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.max_attachment_bytes must be non-zero".into(),
            ));
        }

        Ok(())
    }

    /// Check if a provider API key is available.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            summary_model: default_summary_model(),
            temperature: default_temperature(),
            max_tokens: None,
            workflow: WorkflowConfig::default(),
            gateway: GatewayConfig::default(),
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.workflow.summary_trigger, 14);
        assert_eq!(config.workflow.keep_after_summary, 5);
        assert_eq!(config.workflow.max_attachment_bytes, 5 * 1024 * 1024);
        assert_eq!(config.gateway.port, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.workflow.summary_trigger, 14);
    }

    #[test]
    fn load_from_missing_path_uses_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/bizcanvas.toml")).unwrap();
        assert_eq!(config.summary_model, "llama-3.1-8b-instant");
    }

    #[test]
    fn load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "llama-3.1-70b"

[workflow]
summary_trigger = 20
keep_after_summary = 4
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "llama-3.1-70b");
        assert_eq!(config.workflow.summary_trigger, 20);
        assert_eq!(config.workflow.keep_after_summary, 4);
        // Untouched fields keep their defaults
        assert_eq!(config.gateway.port, 8000);
    }

    #[test]
    fn invalid_thresholds_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[workflow]
summary_trigger = 4
keep_after_summary = 5
"#,
        )
        .unwrap();

        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("gsk_secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("REDACTED"));
    }
}
