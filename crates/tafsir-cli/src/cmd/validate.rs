//! Validate subcommand - read-only checks and a JSON report

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color};
use tafsir_core::{SharedProgress, fmt_bytes};
use tafsir_generate::ReferenceCorpus;
use tafsir_store::DocumentStore;
use tafsir_validate::{ValidationPass, ValidationReport};

use super::{RangeArgs, exit_code, print_summary, styled_table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Layers every sub-unit must have (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4")]
    pub layers: Vec<u8>,

    /// Where to write the JSON report (default: log directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip the reference corpus; only sub-units present in documents are checked
    #[arg(long)]
    pub no_corpus: bool,
}

pub fn run(args: ValidateArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let corpus = if args.no_corpus {
        None
    } else {
        match ReferenceCorpus::load(&config.paths.corpus_file) {
            Ok(c) => Some(c),
            Err(e) => {
                log::warn!("{e:#}; checking documents without the corpus");
                None
            }
        }
    };
    let last = corpus.as_ref().map_or(114, |c| c.max_section());
    let (start, end) = args.range.resolve(last);

    for &layer in &args.layers {
        if tafsir_generate::layer(layer).is_none() {
            return Err(tafsir_generate::ConfigError::UnknownLayer(layer).into());
        }
    }

    let store = DocumentStore::new(&config.paths.data_dir)?;
    let mut pass = ValidationPass::default();
    pass.min_chars = config.validation.min_chars;
    pass.max_chars = config.validation.max_chars;
    pass.required_layers = args.layers.clone();
    if let Some(corpus) = &corpus {
        pass = pass.with_corpus(corpus);
    }

    log::info!("Validating sections {start}-{end} in {}", config.paths.data_dir.display());
    let spinner = progress.stage_line("validate");
    spinner.set_message(format!("sections {start}-{end}"));
    let sections = pass.run(&store, start, end)?;
    spinner.finish_and_clear();
    let factor = config.validation.size_deviation_factor;
    let report = ValidationReport::build(start, end, sections, factor);

    let dir = args.output.unwrap_or_else(|| config.paths.log_dir.clone());
    let path = report.save(&dir)?;
    log::info!("Report: {}", path.display());

    print_report(&report, progress.is_tty());
    Ok(exit_code(report.is_success(), false))
}

fn print_report(report: &ValidationReport, is_tty: bool) {
    let t = &report.totals;
    if !is_tty {
        log::info!(
            "Validation: {} checked, {} complete, {} incomplete, {} missing, {} unparsable, \
             {} anomalies",
            t.sections_checked,
            t.complete,
            t.incomplete,
            t.missing,
            t.unparsable,
            t.too_short + t.too_long + t.failure_sentinels
        );
        for rec in &report.recommendations {
            log::warn!("{rec}");
        }
        return;
    }

    print_summary(
        "Validation",
        &[
            ("Sections", format!("{}-{}", report.start, report.end)),
            ("Complete", t.complete.to_string()),
            ("Incomplete", format!("{} ({} sub-units)", t.incomplete, t.incomplete_sub_units)),
            ("Missing", t.missing.to_string()),
            ("Unparsable", t.unparsable.to_string()),
            ("Too short", t.too_short.to_string()),
            ("Too long", t.too_long.to_string()),
            ("Failed values", t.failure_sentinels.to_string()),
            ("Total size", fmt_bytes(report.size.total_bytes)),
            ("Average file", fmt_bytes(report.size.average_bytes)),
        ],
    );

    let problems: Vec<_> = report.sections.iter().filter(|s| !s.is_complete()).collect();
    if !problems.is_empty() {
        let mut table = styled_table(&["Section", "Status", "Detail"]);
        for s in problems.iter().take(40) {
            let (status, detail) = if !s.exists {
                ("missing", String::new())
            } else if let Some(e) = &s.parse_error {
                ("unparsable", e.clone())
            } else {
                let subs: Vec<String> = s.incomplete.keys().take(10).map(u32::to_string).collect();
                let more = if s.incomplete.len() > 10 { ", ..." } else { "" };
                ("incomplete", format!("sub-units {}{more}", subs.join(", ")))
            };
            table.add_row(vec![
                Cell::new(s.section),
                Cell::new(status).fg(Color::Red),
                Cell::new(detail),
            ]);
        }
        eprintln!("{table}");
        if problems.len() > 40 {
            eprintln!("... and {} more sections", problems.len() - 40);
        }
    }

    for rec in &report.recommendations {
        eprintln!("  - {rec}");
    }
}
