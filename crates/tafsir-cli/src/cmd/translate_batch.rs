//! Translate-batch subcommand - one child process per section

use std::ffi::OsString;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{Args, ValueEnum};
use comfy_table::{Cell, Color};
use tafsir_core::{SharedProgress, fmt_duration};
use tafsir_generate::{BatchReport, SectionOutcome, TranslateBatch, variant};
use tafsir_store::DocumentStore;

use super::{ProviderKind, RangeArgs, exit_code, load_corpus, open_run_log, styled_table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct TranslateBatchArgs {
    /// Target language code
    #[arg(long)]
    pub lang: String,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Translation backend passed to each child
    #[arg(long, value_enum, default_value = "google")]
    pub provider: ProviderKind,

    /// Wall-clock limit per section in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Flags every child inherits so it sees the same configuration.
pub fn child_args(
    config_path: Option<&std::path::Path>,
    config: &Config,
    debug: bool,
) -> Vec<OsString> {
    let mut args = Vec::new();
    if let Some(path) = config_path {
        args.push("--config".into());
        args.push(path.as_os_str().to_owned());
    }
    args.push("--data-dir".into());
    args.push(config.paths.data_dir.as_os_str().to_owned());
    args.push("--max-retries".into());
    args.push(config.retry.max_attempts.to_string().into());
    if debug {
        args.push("--debug".into());
    }
    args
}

pub fn run(
    args: TranslateBatchArgs,
    config: &Config,
    base_args: Vec<OsString>,
    progress: &SharedProgress,
) -> Result<ExitCode> {
    let target = variant(&args.lang)
        .ok_or_else(|| anyhow!("unsupported language code {:?}", args.lang))?;
    let corpus = load_corpus(config)?;
    let (start, end) = args.range.resolve(corpus.max_section());
    tafsir_generate::validate_range(start, end)?;

    // children cannot prompt, so the key is settled here and handed down
    let child_env: Vec<(OsString, OsString)> = args
        .provider
        .credential(config)?
        .map(|(var, key)| (OsString::from(var), OsString::from(key)))
        .into_iter()
        .collect();

    let provider = args
        .provider
        .to_possible_value()
        .map(|v| v.get_name().to_string())
        .unwrap_or_default();

    let program = std::env::current_exe().context("failed to locate the tafsir executable")?;
    let store = DocumentStore::new(&config.paths.data_dir)?;
    let prefix = format!("translation_log_{}", target.code);
    let run_log = open_run_log(config, &prefix, "txt")?;
    let secs = args.timeout.unwrap_or(config.translation.subprocess_timeout_secs);
    let timeout = Duration::from_secs(secs);

    let report = TranslateBatch::new(&store, program, base_args, target, timeout)
        .with_child_args(vec!["--provider".into(), provider.into()])
        .with_child_env(child_env)
        .with_run_log(run_log)
        .run(start, end)?;

    print_report(&report, progress.is_tty());
    Ok(exit_code(report.is_success(), report.interrupted))
}

fn print_report(report: &BatchReport, is_tty: bool) {
    let success = report.count(|o| *o == SectionOutcome::Success);
    let failed = report.count(|o| matches!(o, SectionOutcome::Failed(_)));
    let timeout = report.count(|o| *o == SectionOutcome::Timeout);
    let skipped = report.count(|o| *o == SectionOutcome::Skipped);

    if !is_tty {
        log::info!(
            "Translate batch: {success} succeeded, {failed} failed, {timeout} timed out, \
             {skipped} skipped in {}",
            fmt_duration(report.elapsed)
        );
        return;
    }

    let mut table = styled_table(&["Section", "Outcome", "Time"]);
    for (section, outcome, elapsed) in &report.outcomes {
        let color = match outcome {
            SectionOutcome::Success => Color::Green,
            SectionOutcome::Skipped => Color::DarkGrey,
            SectionOutcome::Failed(_) | SectionOutcome::Timeout => Color::Red,
        };
        let label = match outcome {
            SectionOutcome::Failed(Some(code)) => format!("{} ({code})", outcome.label()),
            _ => outcome.label().to_string(),
        };
        table.add_row(vec![
            Cell::new(section),
            Cell::new(label).fg(color),
            Cell::new(fmt_duration(*elapsed)),
        ]);
    }
    eprintln!("\n{table}");
    eprintln!(
        "{success} succeeded, {failed} failed, {timeout} timed out, {skipped} skipped in {}",
        fmt_duration(report.elapsed)
    );
}
