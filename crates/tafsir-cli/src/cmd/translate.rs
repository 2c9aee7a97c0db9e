//! Translate subcommand - add a language variant of existing layers

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use tafsir_core::SharedProgress;
use tafsir_generate::{BatchOrchestrator, RunOptions, UnitSpace};
use tafsir_store::DocumentStore;

use super::{ProviderKind, RangeArgs, exit_code, load_corpus, open_run_log, post_processor};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct TranslateArgs {
    /// Target language code (ar, fr, ur, tr, id, fa, ms, bn, hi, es, de, ru, zh-cn)
    #[arg(long)]
    pub lang: String,

    /// Translate a single section (overrides --start/--end)
    #[arg(long)]
    pub section: Option<u32>,

    #[command(flatten)]
    pub range: RangeArgs,

    /// Layers to translate (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4,5")]
    pub layers: Vec<u8>,

    /// Translation backend
    #[arg(long, value_enum, default_value = "google")]
    pub provider: ProviderKind,

    /// Attempt units stored as failures again
    #[arg(long)]
    pub retry_failed: bool,
}

pub fn run(args: TranslateArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let corpus = load_corpus(config)?;
    let (start, end) = match args.section {
        Some(n) => (n, n),
        None => args.range.resolve(corpus.max_section()),
    };

    let space = UnitSpace::new(&corpus, &args.layers, Some(&args.lang))?;
    space.sections(start, end)?;

    let provider = args.provider.build(config)?;
    let store = DocumentStore::new(&config.paths.data_dir)?;
    let post = post_processor(config)?;
    let prefix = format!("translate_{}", args.lang.to_lowercase());
    let run_log = open_run_log(config, &prefix, "log")?;

    let summary = BatchOrchestrator::new(&space, &store, provider, &post)
        .with_retry(config.retry.policy(true))
        .with_options(RunOptions {
            retry_failed: args.retry_failed,
            require_lower_layers: false,
        })
        .with_progress(progress)
        .with_run_log(run_log)
        .run(start, end)?;

    super::generate::report("Translation", &summary, progress.is_tty());
    Ok(exit_code(summary.is_success(), summary.interrupted))
}
