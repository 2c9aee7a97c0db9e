//! Configuration loading from TOML files

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tafsir_core::RetryPolicy;
use tafsir_generate::{ChatConfig, CostCeiling, GoogleTranslate};

/// Everything the subcommands read from `tafsir.toml`
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub deepseek: ChatSection,
    pub openrouter: ChatSection,
    pub google: GoogleConfig,
    pub retry: RetryConfig,
    pub generation: GenerationConfig,
    pub validation: ValidationConfig,
    pub translation: TranslationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where `tafsir_<n>.json` documents live
    pub data_dir: PathBuf,
    pub corpus_file: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            corpus_file: PathBuf::from("./quran_data.json"),
            log_dir: PathBuf::from("./logs"),
        }
    }
}

/// One OpenAI-compatible backend. Unset fields fall back to the preset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatSection {
    pub base_url: Option<String>,
    pub model: Option<String>,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
    /// Maximum USD per call
    pub max_price: Option<f64>,
    pub prompt_price_per_million: Option<f64>,
    pub completion_price_per_million: Option<f64>,
}

impl ChatSection {
    /// Overlay this section and the shared generation settings on `preset`.
    pub fn apply(&self, mut preset: ChatConfig, config: &Config) -> ChatConfig {
        if let Some(url) = &self.base_url {
            preset.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            preset.model = model.clone();
        }
        preset.max_tokens = config.generation.max_tokens;
        preset.temperature = config.generation.temperature;
        preset.request_timeout = Duration::from_secs(config.retry.request_timeout_secs);

        let base = preset.ceiling.unwrap_or(CostCeiling {
            max_price: f64::INFINITY,
            prompt_per_million: 0.0,
            completion_per_million: 0.0,
        });
        let ceiling = CostCeiling {
            max_price: self.max_price.unwrap_or(base.max_price),
            prompt_per_million: self.prompt_price_per_million.unwrap_or(base.prompt_per_million),
            completion_per_million: self
                .completion_price_per_million
                .unwrap_or(base.completion_per_million),
        };
        if preset.ceiling.is_some() || self.max_price.is_some() {
            preset.ceiling = Some(ceiling);
        }
        preset
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub base_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            base_url: GoogleTranslate::DEFAULT_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub generate_throttle_ms: u64,
    pub translate_throttle_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            generate_throttle_ms: 100,
            translate_throttle_ms: 500,
            request_timeout_secs: 120,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self, translating: bool) -> RetryPolicy {
        let throttle = if translating {
            self.translate_throttle_ms
        } else {
            self.generate_throttle_ms
        };
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            throttle: Duration::from_millis(throttle),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub min_fragment_chars: usize,
    /// Replaces the built-in prefix patterns when non-empty
    pub prefix_patterns: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_tokens: 800,
            temperature: 0.7,
            min_fragment_chars: 10,
            prefix_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_chars: usize,
    pub max_chars: usize,
    pub size_deviation_factor: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_chars: 100,
            max_chars: 2000,
            size_deviation_factor: 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub subprocess_timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            subprocess_timeout_secs: 600,
        }
    }
}

/// Optional string where `${VAR}` means "read VAR from the environment".
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// An unset variable yields `None`; anything else passes through.
fn expand_env_var(value: &str) -> Option<String> {
    match value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        Some(name) => std::env::var(name).ok(),
        None => Some(value.to_string()),
    }
}

impl Config {
    /// First existing file of `./tafsir.toml` then
    /// `<config dir>/tafsir/config.toml`; defaults when neither exists.
    pub fn load() -> Result<Self> {
        match Self::candidates().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(&path),
            None => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("tafsir.toml")];
        if let Some(dirs) = directories::ProjectDirs::from("", "", "tafsir") {
            paths.push(dirs.config_dir().join("config.toml"));
        }
        paths
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
