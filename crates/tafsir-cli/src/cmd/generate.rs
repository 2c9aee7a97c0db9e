//! Generate subcommand - write commentary layers for a section range

use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::Args;
use tafsir_core::{SharedProgress, fmt_duration, fmt_num};
use tafsir_generate::{BatchOrchestrator, RunOptions, RunSummary, UnitSpace};
use tafsir_store::DocumentStore;

use super::{
    ProviderKind, RangeArgs, exit_code, load_corpus, open_run_log, post_processor, print_summary,
};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Layers to generate (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4")]
    pub layers: Vec<u8>,

    /// Generate only this layer, and only for sections whose lower layers are complete
    #[arg(long, conflicts_with = "layers")]
    pub only_layer: Option<u8>,

    /// Generation backend
    #[arg(long, value_enum, default_value = "deepseek")]
    pub provider: ProviderKind,

    /// Attempt units stored as failures again
    #[arg(long)]
    pub retry_failed: bool,
}

pub fn run(args: GenerateArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    if !args.provider.can_generate() {
        bail!("provider {:?} can only translate", args.provider);
    }
    let corpus = load_corpus(config)?;
    let (start, end) = args.range.resolve(corpus.max_section());
    let layers = args.only_layer.map_or(args.layers, |l| vec![l]);

    let space = UnitSpace::new(&corpus, &layers, None)?;
    space.sections(start, end)?;

    let provider = args.provider.build(config)?;
    let store = DocumentStore::new(&config.paths.data_dir)?;
    let post = post_processor(config)?;
    let run_log = open_run_log(config, "generate", "log")?;

    log::info!("Generating layers {layers:?} for sections {start}-{end}");
    log::info!("  Output: {}", config.paths.data_dir.display());

    let summary = BatchOrchestrator::new(&space, &store, provider, &post)
        .with_retry(config.retry.policy(false))
        .with_options(RunOptions {
            retry_failed: args.retry_failed,
            require_lower_layers: args.only_layer.is_some(),
        })
        .with_progress(progress)
        .with_run_log(run_log)
        .run(start, end)?;

    report("Generation", &summary, progress.is_tty());
    Ok(exit_code(summary.is_success(), summary.interrupted))
}

/// Table on a TTY, one log line otherwise.
pub fn report(title: &str, summary: &RunSummary, is_tty: bool) {
    if !is_tty {
        log::info!(
            "{title}: {} sections, {}/{} completed, {} failed, {} skipped, {} writes in {}{}",
            summary.sections,
            fmt_num(summary.completed),
            fmt_num(summary.total),
            summary.failed,
            summary.skipped,
            summary.writes,
            fmt_duration(summary.elapsed),
            if summary.interrupted { " (interrupted)" } else { "" }
        );
        return;
    }
    print_summary(
        title,
        &[
            ("Sections", summary.sections.to_string()),
            (
                "Units",
                format!(
                    "{}/{} ({:.1}%)",
                    fmt_num(summary.completed + summary.failed + summary.skipped),
                    fmt_num(summary.total),
                    summary.percent()
                ),
            ),
            ("Completed", fmt_num(summary.completed)),
            ("Failed", fmt_num(summary.failed)),
            ("Skipped", fmt_num(summary.skipped)),
            ("Writes", fmt_num(summary.writes)),
            ("Interrupted", if summary.interrupted { "yes" } else { "no" }.to_string()),
            ("Time", fmt_duration(summary.elapsed)),
        ],
    );
}
