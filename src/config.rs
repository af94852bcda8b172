use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::generator::DeckPolicy;
use crate::registry::Curriculum;

// 配置文件结构
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub path: PathConfig,
    pub database: DatabaseConfig,
    pub output: OutputConfig,
    pub input: InputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default)]
    pub openrouter_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub models: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub tokenizer_model: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            tokenizer_model: default_model(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProcessingConfig {
    #[serde(default = "default_concurrency")]
    pub concurrent_requests: usize,
    #[serde(default = "default_delay")]
    pub request_delay_ms: u64,
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: default_concurrency(),
            request_delay_ms: default_delay(),
            max_retries: default_retries(),
            request_timeout_seconds: default_timeout(),
        }
    }
}

// 学习路径生成策略
#[derive(Debug, Deserialize, Clone)]
pub struct PathConfig {
    #[serde(default)]
    pub curriculum: Curriculum,
    #[serde(default = "default_words_per_deck")]
    pub words_per_deck: usize,
    #[serde(default = "default_true")]
    pub separate_verb_decks: bool,
    #[serde(default)]
    pub max_words: Option<usize>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            curriculum: Curriculum::default(),
            words_per_deck: default_words_per_deck(),
            separate_verb_decks: true,
            max_words: None,
        }
    }
}

impl PathConfig {
    pub fn deck_policy(&self) -> DeckPolicy {
        DeckPolicy {
            words_per_deck: self.words_per_deck,
            separate_verb_decks: self.separate_verb_decks,
            max_words: self.max_words,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub db_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub vocab_file: String,
    pub grammar_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub transcript_file: String,
    pub registry_file: String,
    pub user_id: String,
    #[serde(default)]
    pub transcript_name: Option<String>,
    #[serde(default)]
    pub show_name: Option<String>,
    #[serde(default)]
    pub episode_name: Option<String>,
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_model() -> String {
    "google/gemini-2.5-flash".to_string()
}

fn default_concurrency() -> usize {
    1
}

fn default_delay() -> u64 {
    500
}

fn default_retries() -> u32 {
    3
}

fn default_timeout() -> u64 {
    60
}

fn default_words_per_deck() -> usize {
    20
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load() -> Result<Config> {
        Self::load_from("config.toml")
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let config_content = std::fs::read_to_string(path)
            .with_context(|| format!("配置文件 {} 不存在或无法读取", path.display()))?;
        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Config> {
        let mut config: Config = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("配置文件解析失败: {}", e))?;

        // 配置文件中没有写密钥时使用环境变量
        if config.api.openrouter_key.trim().is_empty() {
            if let Ok(key) = std::env::var("OPENROUTER_API_KEY") {
                config.api.openrouter_key = key;
            }
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.path.words_per_deck == 0 {
            anyhow::bail!("path.words_per_deck 必须大于 0");
        }
        if self.processing.concurrent_requests == 0 {
            anyhow::bail!("processing.concurrent_requests 必须大于 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[api]
openrouter_key = "sk-test"

[database]
db_file = "paths.db"

[output]
vocab_file = "vocab.csv"
grammar_file = "grammar.csv"

[input]
transcript_file = "episode.srt"
registry_file = "patterns.toml"
user_id = "user-1"
"#;

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = Config::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.api.openrouter_key, "sk-test");
        assert_eq!(config.api.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.processing.concurrent_requests, 1);
        assert_eq!(config.processing.max_retries, 3);
        assert_eq!(config.path.curriculum, Curriculum::Genki1);
        assert_eq!(config.path.words_per_deck, 20);
        assert!(config.path.separate_verb_decks);
        assert!(config.input.show_name.is_none());
    }

    #[test]
    fn test_path_policy_section() {
        let content = format!(
            "{}\n[path]\ncurriculum = \"tobira\"\nwords_per_deck = 5\nseparate_verb_decks = false\nmax_words = 40\n",
            MINIMAL
        );
        let config = Config::from_toml_str(&content).unwrap();
        let policy = config.path.deck_policy();

        assert_eq!(config.path.curriculum, Curriculum::Tobira);
        assert_eq!(policy.words_per_deck, 5);
        assert!(!policy.separate_verb_decks);
        assert_eq!(policy.max_words, Some(40));
    }

    #[test]
    fn test_zero_deck_size_rejected() {
        let content = format!("{}\n[path]\nwords_per_deck = 0\n", MINIMAL);
        assert!(Config::from_toml_str(&content).is_err());
    }
}
