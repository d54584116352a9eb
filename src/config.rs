//! Runtime configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. See [`RuntimeConfig::from_toml_str`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::concurrency::RetryPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProviderSettings,
}

impl RuntimeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::MissingConfig(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.concurrency.validate()?;
        self.agent.validate()?;
        self.providers.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn` or `error`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Gate capacity: provider calls allowed in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Total attempts per provider call, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Per-attempt timeout; 0 disables it.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_max_concurrent() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ConcurrencyConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            timeout: (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs)),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidConfig("concurrency.max_concurrent must be at least 1".into()));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidConfig("concurrency.max_attempts must be at least 1".into()));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigError::InvalidConfig(
                "concurrency.max_delay_ms must not be below base_delay_ms".into(),
            ));
        }
        Ok(())
    }
}

/// Which output grammar the system prompt asks the model for. The parser
/// accepts both regardless.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Tagged,
    JsonEnvelope,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Most recent history entries rendered into each request.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// History entries retained; older ones are dropped.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_max_observation_chars")]
    pub max_observation_chars: usize,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub format: ResponseFormat,
}

fn default_max_iterations() -> usize {
    10
}

fn default_context_window() -> usize {
    15
}

fn default_history_limit() -> usize {
    30
}

fn default_max_observation_chars() -> usize {
    1500
}

fn default_max_context_chars() -> usize {
    6000
}

fn default_temperature() -> f32 {
    crate::llm::DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    crate::llm::DEFAULT_MAX_TOKENS
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::react()
    }
}

impl AgentConfig {
    /// Multi-turn tag-grammar loop.
    pub fn react() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            context_window: default_context_window(),
            history_limit: default_history_limit(),
            max_observation_chars: default_max_observation_chars(),
            max_context_chars: default_max_context_chars(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            format: ResponseFormat::Tagged,
        }
    }

    /// Shorter JSON-envelope loop.
    pub fn legacy() -> Self {
        Self {
            max_iterations: 5,
            format: ResponseFormat::JsonEnvelope,
            ..Self::react()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let zero = [
            ("agent.max_iterations", self.max_iterations),
            ("agent.context_window", self.context_window),
            ("agent.history_limit", self.history_limit),
            ("agent.max_observation_chars", self.max_observation_chars),
            ("agent.max_context_chars", self.max_context_chars),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);
        if let Some((key, _)) = zero {
            return Err(ConfigError::InvalidConfig(format!("{} must be at least 1", key)));
        }
        if self.history_limit < self.context_window {
            return Err(ConfigError::InvalidConfig(
                "agent.history_limit must not be below context_window".into(),
            ));
        }
        Ok(())
    }
}

/// `[providers.openai]` / `[providers.deepseek]` / `[providers.gemini]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the key, read when `api_key` is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl CloudSettings {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| self.api_key_env.as_ref().and_then(|var| std::env::var(var).ok()))
            .filter(|key| !key.trim().is_empty())
    }
}

/// `[providers.local]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_local_host")]
    pub host: String,
    #[serde(default = "default_local_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_local_host() -> String {
    "http://localhost".to_string()
}

fn default_local_port() -> u16 {
    11434
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_local_host(),
            port: default_local_port(),
            model: None,
        }
    }
}

impl LocalSettings {
    /// Daemon URL built from `host` and `port`.
    pub fn endpoint(&self) -> Result<reqwest::Url, ConfigError> {
        let invalid = |reason: String| {
            ConfigError::InvalidConfig(format!("providers.local.host '{}' {}", self.host, reason))
        };
        let mut url = reqwest::Url::parse(&self.host).map_err(|err| invalid(format!("is not a valid URL: {}", err)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("must be an http(s) URL".to_string()));
        }
        url.set_port(Some(self.port))
            .map_err(|_| invalid("cannot carry a port".to_string()))?;
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Explicit provider name or `"auto"`.
    #[serde(default = "default_selected")]
    pub selected: String,
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,
    #[serde(default = "openai_settings")]
    pub openai: CloudSettings,
    #[serde(default = "deepseek_settings")]
    pub deepseek: CloudSettings,
    #[serde(default = "gemini_settings")]
    pub gemini: CloudSettings,
    #[serde(default)]
    pub local: LocalSettings,
}

fn default_selected() -> String {
    "auto".to_string()
}

fn default_priority() -> Vec<String> {
    ["deepseek", "openai", "gemini", "local"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn env_settings(var: &str) -> CloudSettings {
    CloudSettings {
        api_key_env: Some(var.to_string()),
        ..CloudSettings::default()
    }
}

fn openai_settings() -> CloudSettings {
    env_settings("OPENAI_API_KEY")
}

fn deepseek_settings() -> CloudSettings {
    env_settings("DEEPSEEK_API_KEY")
}

fn gemini_settings() -> CloudSettings {
    env_settings("GEMINI_API_KEY")
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            selected: default_selected(),
            priority: default_priority(),
            openai: openai_settings(),
            deepseek: deepseek_settings(),
            gemini: gemini_settings(),
            local: LocalSettings::default(),
        }
    }
}

impl ProviderSettings {
    /// Settings with no keys and no environment lookups; handy in tests.
    pub fn offline() -> Self {
        Self {
            openai: CloudSettings::default(),
            deepseek: CloudSettings::default(),
            gemini: CloudSettings::default(),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.priority.is_empty() {
            return Err(ConfigError::InvalidConfig("providers.priority must not be empty".into()));
        }
        self.local.endpoint().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config.concurrency.max_concurrent, 5);
        assert_eq!(config.concurrency.max_attempts, 3);
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.agent.context_window, 15);
        assert_eq!(config.providers.selected, "auto");
        assert_eq!(config.providers.priority, vec!["deepseek", "openai", "gemini", "local"]);
        assert_eq!(config.providers.gemini.api_key_env.as_deref(), Some("GEMINI_API_KEY"));
    }

    #[test]
    fn partial_tables_merge_with_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [concurrency]
            max_concurrent = 2
            request_timeout_secs = 0

            [agent]
            format = "json_envelope"

            [providers.local]
            enabled = true
            model = "qwen2.5"
            "#,
        )
        .unwrap();
        assert_eq!(config.concurrency.max_concurrent, 2);
        assert_eq!(config.concurrency.max_attempts, 3);
        assert_eq!(config.concurrency.retry_policy().timeout, None);
        assert_eq!(config.agent.format, ResponseFormat::JsonEnvelope);
        assert!(config.providers.local.enabled);
        assert_eq!(config.providers.local.port, 11434);
    }

    #[test]
    fn zero_values_are_rejected() {
        let err = RuntimeConfig::from_toml_str("[concurrency]\nmax_concurrent = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(msg) if msg.contains("max_concurrent")));

        let err = RuntimeConfig::from_toml_str("[agent]\nmax_iterations = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(msg) if msg.contains("max_iterations")));
    }

    #[test]
    fn local_host_must_parse() {
        for host in ["http://", "localhost", "ftp://localhost", "http://local host"] {
            let doc = format!("[providers.local]\nhost = \"{}\"", host);
            let err = RuntimeConfig::from_toml_str(&doc).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidConfig(msg) if msg.contains("providers.local.host")), "{}", host);
        }

        let local = LocalSettings {
            host: "https://gpu-box.lan".to_string(),
            port: 8080,
            ..LocalSettings::default()
        };
        assert_eq!(local.endpoint().unwrap().as_str(), "https://gpu-box.lan:8080/");
    }

    #[test]
    fn presets() {
        assert_eq!(AgentConfig::react().max_iterations, 10);
        let legacy = AgentConfig::legacy();
        assert_eq!(legacy.max_iterations, 5);
        assert_eq!(legacy.format, ResponseFormat::JsonEnvelope);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();
        let config = RuntimeConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");

        let missing = RuntimeConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::MissingConfig(_)));
    }
}
