//! tafsir - batch commentary generation and translation
//!
//! Generates layered commentary for every sub-unit of the reference corpus,
//! translates it into supported languages and validates the stored result.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;
mod credentials;

use config::Config;

#[derive(Parser)]
#[command(name = "tafsir")]
#[command(about = "Batch commentary generation, translation and validation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./tafsir.toml or ~/.config/tafsir/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding tafsir_<n>.json documents
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Maximum attempts per unit, first call included
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Generate commentary layers
    Generate(cmd::generate::GenerateArgs),
    /// Translate existing layers into one language
    Translate(cmd::translate::TranslateArgs),
    /// Translate section by section in child processes with a time limit
    TranslateBatch(cmd::translate_batch::TranslateBatchArgs),
    /// Check stored documents and write a JSON report
    Validate(cmd::validate::ValidateArgs),
    /// Strip model banners from stored values
    Clean(cmd::clean::CleanArgs),
    /// Show generation progress per section
    Status(cmd::status::StatusArgs),
    /// Show current configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(tafsir_core::ProgressContext::new());

    // Logging:
    //   TTY:     warn unless --debug, progress bars show activity
    //   non-TTY: info unless --debug, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    tafsir_core::init_logging(quiet, cli.debug, multi);

    if let Err(e) = tafsir_core::install_signal_handlers() {
        log::warn!("Failed to install signal handlers: {e}");
    }

    match run(cli, &progress) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli, progress: &tafsir_core::SharedProgress) -> Result<ExitCode> {
    let mut config = if let Some(path) = &cli.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // CLI overrides
    if let Some(dir) = cli.data_dir {
        config.paths.data_dir = dir;
    }
    if let Some(n) = cli.max_retries {
        config.retry.max_attempts = n;
    }

    match cli.command {
        Command::Generate(args) => cmd::generate::run(args, &config, progress),
        Command::Translate(args) => cmd::translate::run(args, &config, progress),
        Command::TranslateBatch(args) => {
            let base = cmd::translate_batch::child_args(cli.config.as_deref(), &config, cli.debug);
            cmd::translate_batch::run(args, &config, base, progress)
        }
        Command::Validate(args) => cmd::validate::run(args, &config, progress),
        Command::Clean(args) => cmd::clean::run(args, &config),
        Command::Status(args) => cmd::status::run(args, &config, progress),
        Command::Config => {
            print_config(&config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_config(config: &Config) {
    let key_state = |key: &Option<String>, env: &str| {
        if key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
            "configured".to_string()
        } else if std::env::var(env).is_ok() {
            format!("from {env}")
        } else {
            "not set".to_string()
        }
    };
    let model = |section: &config::ChatSection, default: &str| {
        section.model.clone().unwrap_or_else(|| default.to_string())
    };
    let r = &config.retry;

    cmd::print_summary(
        "Setting",
        &[
            ("Data directory", config.paths.data_dir.display().to_string()),
            ("Corpus file", config.paths.corpus_file.display().to_string()),
            ("Log directory", config.paths.log_dir.display().to_string()),
            ("DeepSeek model", model(&config.deepseek, "deepseek-chat")),
            (
                "DeepSeek API key",
                key_state(&config.deepseek.api_key, credentials::DEEPSEEK_ENV),
            ),
            ("OpenRouter model", model(&config.openrouter, "deepseek/deepseek-chat")),
            (
                "OpenRouter API key",
                key_state(&config.openrouter.api_key, credentials::OPENROUTER_ENV),
            ),
            (
                "OpenRouter max price",
                config
                    .openrouter
                    .max_price
                    .map_or_else(|| "preset".to_string(), |p| format!("${p}")),
            ),
            ("Google URL", config.google.base_url.clone()),
            ("Max attempts", r.max_attempts.to_string()),
            ("Base delay", format!("{}ms", r.base_delay_ms)),
            (
                "Throttle",
                format!(
                    "{}ms generate, {}ms translate",
                    r.generate_throttle_ms, r.translate_throttle_ms
                ),
            ),
            ("Request timeout", format!("{}s", r.request_timeout_secs)),
            ("Max tokens", config.generation.max_tokens.to_string()),
            ("Temperature", config.generation.temperature.to_string()),
            (
                "Length band",
                format!(
                    "{}-{} chars",
                    config.validation.min_chars, config.validation.max_chars
                ),
            ),
            (
                "Size deviation",
                format!("{}x", config.validation.size_deviation_factor),
            ),
            (
                "Subprocess timeout",
                format!("{}s", config.translation.subprocess_timeout_secs),
            ),
        ],
    );
}
