//! Status subcommand - progress monitor over stored documents

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color};
use tafsir_core::{SharedProgress, fmt_bytes, fmt_num};
use tafsir_generate::ReferenceCorpus;
use tafsir_store::DocumentStore;
use tafsir_validate::CorpusStatus;

use super::{RangeArgs, styled_table};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Layers that make a sub-unit complete (comma-separated)
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4")]
    pub layers: Vec<u8>,

    /// List every section, not only unfinished ones
    #[arg(short, long)]
    pub all: bool,
}

pub fn run(args: StatusArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let corpus = ReferenceCorpus::load(&config.paths.corpus_file)
        .inspect_err(|e| log::debug!("{e:#}"))
        .ok();
    let store = DocumentStore::new(&config.paths.data_dir)?;
    let last = match &corpus {
        Some(c) => c.max_section(),
        None => store.list_sections()?.last().copied().unwrap_or(1),
    };
    let (start, end) = args.range.resolve(last);

    let spinner = progress.stage_line("status");
    let status = CorpusStatus::collect(&store, start, end, &args.layers, corpus.as_ref())?;
    spinner.finish_and_clear();
    let projected = status.projected_bytes.map_or_else(|| "-".to_string(), fmt_bytes);

    if !progress.is_tty() {
        log::info!(
            "Status {start}-{end}: {} files, {}/{} sub-units complete ({:.1}%), {} on disk, \
             projected {projected}",
            status.files,
            fmt_num(status.complete),
            fmt_num(status.target_sub_units()),
            status.percent(),
            fmt_bytes(status.bytes),
        );
        return Ok(ExitCode::SUCCESS);
    }

    let mut table = styled_table(&["Section", "Sub-units", "Complete", "Size", "State"]);
    for row in status.rows.iter().filter(|r| args.all || !r.is_done()) {
        let (state, color) = if !row.exists {
            ("missing", Color::DarkGrey)
        } else if !row.readable {
            ("unreadable", Color::Red)
        } else if row.is_done() {
            ("done", Color::Green)
        } else {
            ("partial", Color::Yellow)
        };
        let expected = row.expected.map_or_else(String::new, |e| format!("/{e}"));
        table.add_row(vec![
            Cell::new(row.section),
            Cell::new(format!("{}{expected}", row.sub_units)),
            Cell::new(row.complete),
            Cell::new(fmt_bytes(row.bytes)),
            Cell::new(state).fg(color),
        ]);
    }
    eprintln!("\n{table}");
    eprintln!(
        "{} files, {}/{} sub-units complete ({:.1}%), {} on disk, projected {projected}",
        status.files,
        fmt_num(status.complete),
        fmt_num(status.target_sub_units()),
        status.percent(),
        fmt_bytes(status.bytes),
    );
    Ok(ExitCode::SUCCESS)
}
