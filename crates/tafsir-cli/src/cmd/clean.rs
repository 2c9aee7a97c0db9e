//! Clean subcommand - strip model banners from stored values

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use tafsir_store::DocumentStore;

use super::{RangeArgs, post_processor, print_summary};
use crate::config::Config;

#[derive(Args, Debug)]
pub struct CleanArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Report what would change without saving
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanSummary {
    pub documents: usize,
    pub changed_documents: usize,
    pub changed_values: usize,
}

pub fn run(args: CleanArgs, config: &Config) -> Result<ExitCode> {
    let store = DocumentStore::new(&config.paths.data_dir)?;
    let last = store.list_sections()?.last().copied().unwrap_or(1);
    let (start, end) = args.range.resolve(last);
    tafsir_generate::validate_range(start, end)?;

    let summary = clean_range(&store, config, start, end, args.dry_run)?;
    print_summary(
        if args.dry_run { "Clean (dry run)" } else { "Clean" },
        &[
            ("Documents", summary.documents.to_string()),
            ("Changed documents", summary.changed_documents.to_string()),
            ("Changed values", summary.changed_values.to_string()),
        ],
    );
    Ok(ExitCode::SUCCESS)
}

/// Saves a document only when at least one value changed.
pub fn clean_range(
    store: &DocumentStore,
    config: &Config,
    start: u32,
    end: u32,
    dry_run: bool,
) -> Result<CleanSummary> {
    let post = post_processor(config)?;
    let mut summary = CleanSummary::default();
    for section in start..=end {
        if !store.exists(section) {
            continue;
        }
        let mut doc = store.load(section)?;
        summary.documents += 1;
        let changed = doc.rewrite_layers(|text| post.strip_prefixes(text));
        if changed == 0 {
            continue;
        }
        log::info!("section {section}: cleaned {changed} value(s)");
        summary.changed_documents += 1;
        summary.changed_values += changed;
        if !dry_run {
            store.save(section, &doc)?;
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tafsir_store::{Document, LayerKey};
    use tempfile::TempDir;

    fn setup() -> (TempDir, DocumentStore, Config) {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path()).unwrap();
        let mut config = Config::default();
        config.paths.data_dir = dir.path().to_path_buf();

        let mut dirty = Document::new();
        dirty.put(1, &LayerKey::base(1), "**Commentary**\n\nThe verse opens with praise.");
        dirty.put(1, &LayerKey::base(2), "Already clean commentary.");
        store.save(1, &dirty).unwrap();

        let mut clean = Document::new();
        clean.put(1, &LayerKey::base(1), "Nothing to strip here.");
        store.save(2, &clean).unwrap();
        (dir, store, config)
    }

    #[test]
    fn strips_banners_and_saves_changed_only() {
        let (dir, store, config) = setup();
        let untouched = std::fs::metadata(dir.path().join("tafsir_2.json"))
            .unwrap()
            .modified()
            .unwrap();

        let summary = clean_range(&store, &config, 1, 3, false).unwrap();
        assert_eq!(
            summary,
            CleanSummary {
                documents: 2,
                changed_documents: 1,
                changed_values: 1,
            }
        );
        let doc = store.load(1).unwrap();
        assert_eq!(doc.get(1, &LayerKey::base(1)), Some("The verse opens with praise."));
        let after = std::fs::metadata(dir.path().join("tafsir_2.json"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(untouched, after);
    }

    #[test]
    fn dry_run_leaves_documents() {
        let (_dir, store, config) = setup();
        let summary = clean_range(&store, &config, 1, 2, true).unwrap();
        assert_eq!(summary.changed_values, 1);
        let doc = store.load(1).unwrap();
        assert!(doc.get(1, &LayerKey::base(1)).unwrap().starts_with("**Commentary**"));
    }
}
