//! Subcommands and the plumbing they share

pub mod clean;
pub mod generate;
pub mod status;
pub mod translate;
pub mod translate_batch;
pub mod validate;

use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use tafsir_core::RunLog;
use tafsir_generate::{
    ChatConfig, ChatProvider, GoogleTranslate, Provider, ReferenceCorpus, TextPostProcessor,
};

use crate::config::Config;
use crate::credentials::{DEEPSEEK_ENV, OPENROUTER_ENV, resolve_api_key};

/// Exit status for an interrupted run
pub const EXIT_INTERRUPTED: u8 = 130;

/// Inclusive section range. `end` defaults to the last corpus section.
#[derive(Args, Debug, Clone, Copy)]
pub struct RangeArgs {
    /// First section (1-based)
    #[arg(long, default_value_t = 1)]
    pub start: u32,

    /// Last section, inclusive (default: last section in the corpus)
    #[arg(long)]
    pub end: Option<u32>,
}

impl RangeArgs {
    pub fn resolve(&self, last: u32) -> (u32, u32) {
        (self.start, self.end.unwrap_or(last))
    }
}

#[derive(Clone, Copy, ValueEnum, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Deepseek,
    Openrouter,
    Google,
}

impl ProviderKind {
    /// API key and the variable it travels in, resolved before any work
    /// starts. Google needs none.
    pub fn credential(self, config: &Config) -> Result<Option<(&'static str, String)>> {
        let (configured, env_var, label) = match self {
            Self::Deepseek => (&config.deepseek.api_key, DEEPSEEK_ENV, "DeepSeek"),
            Self::Openrouter => (&config.openrouter.api_key, OPENROUTER_ENV, "OpenRouter"),
            Self::Google => return Ok(None),
        };
        let key = resolve_api_key(configured.as_deref(), env_var, label)?;
        Ok(Some((env_var, key)))
    }

    /// Build the backend. Keys are resolved here, before any work starts.
    pub fn build(self, config: &Config) -> Result<Box<dyn Provider>> {
        let key = self.credential(config)?.map(|(_, key)| key).unwrap_or_default();
        let provider: Box<dyn Provider> = match self {
            Self::Deepseek => {
                let chat = config.deepseek.apply(ChatConfig::deepseek(key), config);
                Box::new(ChatProvider::new("deepseek", chat)?)
            }
            Self::Openrouter => {
                let chat = config.openrouter.apply(ChatConfig::openrouter(key), config);
                Box::new(ChatProvider::new("openrouter", chat)?)
            }
            Self::Google => Box::new(GoogleTranslate::new(
                config.google.base_url.clone(),
                std::time::Duration::from_secs(config.retry.request_timeout_secs),
            )?),
        };
        Ok(provider)
    }

    pub fn can_generate(self) -> bool {
        self != Self::Google
    }
}

pub fn load_corpus(config: &Config) -> Result<ReferenceCorpus> {
    let path = &config.paths.corpus_file;
    let corpus = ReferenceCorpus::load(path)?;
    if corpus.sections().is_empty() {
        bail!("reference corpus {} has no sections", path.display());
    }
    log::info!(
        "Loaded corpus: {} sections, {} sub-units",
        corpus.sections().len(),
        corpus.sub_unit_count()
    );
    Ok(corpus)
}

pub fn post_processor(config: &Config) -> Result<TextPostProcessor> {
    let min = config.generation.min_fragment_chars;
    let post = if config.generation.prefix_patterns.is_empty() {
        TextPostProcessor::new(tafsir_generate::DEFAULT_PREFIX_PATTERNS, min)
    } else {
        TextPostProcessor::new(&config.generation.prefix_patterns, min)
    };
    post.context("invalid prefix pattern in [generation]")
}

pub fn open_run_log(config: &Config, prefix: &str, ext: &str) -> Result<RunLog> {
    RunLog::create(&config.paths.log_dir, prefix, ext)
        .with_context(|| format!("failed to create run log in {}", config.paths.log_dir.display()))
}

/// 130 when interrupted, 1 when anything failed for good.
pub fn exit_code(success: bool, interrupted: bool) -> ExitCode {
    if interrupted {
        ExitCode::from(EXIT_INTERRUPTED)
    } else if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Print a key-value summary table on stderr
pub fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}

/// Table with a cyan header row
pub fn styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(exit_code(true, false), ExitCode::SUCCESS);
        assert_eq!(exit_code(false, false), ExitCode::FAILURE);
        assert_eq!(exit_code(true, true), ExitCode::from(130));
    }

    #[test]
    fn range_defaults_to_corpus_end() {
        let range = RangeArgs { start: 3, end: None };
        assert_eq!(range.resolve(114), (3, 114));
        let range = RangeArgs { start: 3, end: Some(5) };
        assert_eq!(range.resolve(114), (3, 5));
    }

    #[test]
    fn custom_prefix_patterns() {
        let mut config = Config::default();
        config.generation.prefix_patterns = vec![r"Answer:\s*".into()];
        let post = post_processor(&config).unwrap();
        assert_eq!(post.strip_prefixes("Answer: The text."), "The text.");

        config.generation.prefix_patterns = vec!["(".into()];
        assert!(post_processor(&config).is_err());
    }

    #[test]
    fn credential_names_its_variable() {
        let mut config = Config::default();
        config.deepseek.api_key = Some("sk-configured".into());
        assert_eq!(
            ProviderKind::Deepseek.credential(&config).unwrap(),
            Some((DEEPSEEK_ENV, "sk-configured".to_string()))
        );
        assert_eq!(ProviderKind::Google.credential(&config).unwrap(), None);
    }

    #[test]
    fn google_cannot_generate() {
        assert!(!ProviderKind::Google.can_generate());
        assert!(ProviderKind::Deepseek.can_generate());
    }
}
