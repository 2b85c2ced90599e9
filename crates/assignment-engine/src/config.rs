use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use codelab_core::domain::{Language, LanguageTable};
use serde::Deserialize;
type Result<T> = anyhow::Result<T>;

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub grader: GraderConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub languages: Vec<LanguageOverride>,
    #[serde(default)]
    pub client_store_dir: Option<PathBuf>,
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("failed to deserialize engine config")
    }

    /// Builtin language table with the configured runtime versions applied.
    pub fn language_table(&self) -> LanguageTable {
        self.languages
            .iter()
            .fold(LanguageTable::builtin(), |table, entry| {
                table.with_runtime_version(entry.id, entry.runtime_version.clone())
            })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sandbox: SandboxConfig::default(),
            grader: GraderConfig::default(),
            persistence: PersistenceConfig::default(),
            languages: Vec::new(),
            client_store_dir: None,
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SandboxConfig {
    #[serde(default = "default_sandbox_url")]
    pub base_url: String,
    #[serde(default = "default_execution_timeout_secs")]
    pub timeout_secs: u64,
}

impl SandboxConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            base_url: default_sandbox_url(),
            timeout_secs: default_execution_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraderConfig {
    #[serde(default = "default_grader_url")]
    pub base_url: String,
    #[serde(default = "default_grader_model")]
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_evaluation_timeout_secs")]
    pub timeout_secs: u64,
}

impl GraderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            base_url: default_grader_url(),
            model: default_grader_model(),
            api_key_env: None,
            temperature: 0.0,
            timeout_secs: default_evaluation_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceConfig {
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl PersistenceConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LanguageOverride {
    pub id: Language,
    pub runtime_version: String,
}

fn default_event_buffer_size() -> usize {
    256
}

fn default_sandbox_url() -> String {
    "https://emkc.org/api/v2/piston".to_string()
}

fn default_grader_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_grader_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_execution_timeout_secs() -> u64 {
    30
}

fn default_evaluation_timeout_secs() -> u64 {
    60
}

fn default_retry_backoff_ms() -> u64 {
    200
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;
    use codelab_core::domain::Language;

    #[test]
    fn test_parse_config() {
        let raw = r#"
event_buffer_size = 64
client_store_dir = "/tmp/codelab"

[sandbox]
base_url = "http://localhost:2000/api/v2"
timeout_secs = 10

[grader]
base_url = "http://localhost:8080/v1"
model = "grader-small"
api_key_env = "GRADER_KEY"
temperature = 0.2

[persistence]
retry_backoff_ms = 50

[[languages]]
id = "python"
runtime_version = "3.12.0"
"#;

        let config = EngineConfig::from_str(raw).expect("config should parse");
        assert_eq!(config.event_buffer_size, 64);
        assert_eq!(config.sandbox.base_url, "http://localhost:2000/api/v2");
        assert_eq!(config.sandbox.timeout_secs, 10);
        assert_eq!(config.grader.model, "grader-small");
        assert_eq!(config.grader.api_key_env.as_deref(), Some("GRADER_KEY"));
        assert_eq!(config.grader.timeout_secs, 60);
        assert_eq!(config.persistence.retry_backoff_ms, 50);

        let table = config.language_table();
        assert_eq!(
            table.profile(Language::Python).expect("python").runtime_version,
            "3.12.0"
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_str("").expect("empty config should parse");

        assert_eq!(config.sandbox.timeout_secs, 30);
        assert_eq!(config.grader.timeout_secs, 60);
        assert_eq!(config.persistence.retry_backoff_ms, 200);
        assert_eq!(config.event_buffer_size, 256);
        assert!(config.languages.is_empty());
        assert!(config.client_store_dir.is_none());
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let raw = r#"
[[languages]]
id = "cobol"
runtime_version = "1"
"#;
        assert!(EngineConfig::from_str(raw).is_err());
    }
}
