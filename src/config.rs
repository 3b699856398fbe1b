use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct KoibitoConfig {
    pub log: LogConfig,
    pub storage: StorageConfig,
    pub chat: ChatConfig,
    pub embedding: EmbeddingConfig,
    pub image: ImageConfig,
    pub memory: MemoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Chat model settings. `model`, `temperature` and `max_tokens` are the
/// fallbacks used when a user has no AI model preference stored.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub anthropic_version: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    /// Messages loaded as conversation context for a reply.
    pub context_messages: usize,
    /// Messages of that context forwarded to the model.
    pub history_in_prompt: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"openai"` or `"none"`.
    pub provider: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ImageConfig {
    pub leonardo_api_key: Option<String>,
    pub base_url: String,
    pub model_id: String,
    pub width: u32,
    pub height: u32,
    pub guidance_scale: f64,
    pub poll_attempts: u32,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MemoryConfig {
    pub max_in_prompt: usize,
    pub min_importance: u8,
    pub delete_after_days: u32,
    pub search_candidates: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_koibito_dir()
            .join("koibito.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            temperature: 0.8,
            max_tokens: 2000,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".into(),
            anthropic_api_key: None,
            anthropic_base_url: "https://api.anthropic.com/v1".into(),
            anthropic_version: "2023-06-01".into(),
            request_timeout_secs: 60,
            max_retries: 3,
            retry_base_delay_ms: 1000,
            context_messages: 15,
            history_in_prompt: 10,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            model: "text-embedding-ada-002".into(),
            timeout_secs: 15,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            leonardo_api_key: None,
            base_url: "https://cloud.leonardo.ai/api/rest/v1".into(),
            model_id: "e71a1c2f-4f80-4800-934f-2c68979d8cc8".into(),
            width: 512,
            height: 768,
            guidance_scale: 8.0,
            poll_attempts: 30,
            poll_interval_secs: 10,
            request_timeout_secs: 60,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_in_prompt: 15,
            min_importance: 5,
            delete_after_days: 90,
            search_candidates: 200,
        }
    }
}

/// Returns `~/.koibito/`
pub fn default_koibito_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".koibito")
}

/// Returns the default config file path: `~/.koibito/config.toml`
pub fn default_config_path() -> PathBuf {
    default_koibito_dir().join("config.toml")
}

impl KoibitoConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            KoibitoConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("KOIBITO_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("KOIBITO_LOG_LEVEL") {
            self.log.level = val;
        }
        if let Ok(val) = std::env::var("OPENAI_API_KEY") {
            self.chat.openai_api_key = Some(val);
        }
        if let Ok(val) = std::env::var("OPENAI_BASE_URL") {
            self.chat.openai_base_url = val;
        }
        if let Ok(val) = std::env::var("OPENAI_MODEL") {
            self.chat.model = val;
        }
        if let Some(val) = env_parse::<f64>("OPENAI_TEMPERATURE") {
            self.chat.temperature = val;
        }
        if let Some(val) = env_parse::<u32>("OPENAI_MAX_TOKENS") {
            self.chat.max_tokens = val;
        }
        if let Ok(val) = std::env::var("ANTHROPIC_API_KEY") {
            self.chat.anthropic_api_key = Some(val);
        }
        if let Ok(val) = std::env::var("LEONARDO_API_KEY") {
            self.image.leonardo_api_key = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(val) => Some(val),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = KoibitoConfig::default();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert_eq!(config.chat.max_tokens, 2000);
        assert_eq!(config.memory.max_in_prompt, 15);
        assert_eq!(config.image.poll_attempts, 30);
        assert!(config.storage.db_path.ends_with("koibito.db"));
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[log]
level = "debug"

[storage]
db_path = "/tmp/test.db"

[chat]
model = "claude-3-haiku"
temperature = 0.5

[image]
width = 768
"#;
        let config: KoibitoConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.storage.db_path, "/tmp/test.db");
        assert_eq!(config.chat.model, "claude-3-haiku");
        assert_eq!(config.chat.temperature, 0.5);
        assert_eq!(config.image.width, 768);
        // defaults still apply for unset fields
        assert_eq!(config.chat.max_tokens, 2000);
        assert_eq!(config.image.height, 768);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = KoibitoConfig::default();
        std::env::set_var("KOIBITO_DB", "/tmp/override.db");
        std::env::set_var("KOIBITO_LOG_LEVEL", "trace");
        std::env::set_var("OPENAI_MAX_TOKENS", "512");
        std::env::set_var("OPENAI_TEMPERATURE", "not-a-number");

        config.apply_env_overrides();

        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.log.level, "trace");
        assert_eq!(config.chat.max_tokens, 512);
        assert_eq!(config.chat.temperature, 0.8);

        std::env::remove_var("KOIBITO_DB");
        std::env::remove_var("KOIBITO_LOG_LEVEL");
        std::env::remove_var("OPENAI_MAX_TOKENS");
        std::env::remove_var("OPENAI_TEMPERATURE");
    }
}
