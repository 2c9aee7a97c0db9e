//! Section documents on disk with atomic replace

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::document::Document;

/// Directory of `tafsir_<section>.json` files.
///
/// Single writer per document. Nothing here locks; the pipeline runs one
/// orchestrator per data directory.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create data dir: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, section: u32) -> PathBuf {
        self.dir.join(format!("tafsir_{section}.json"))
    }

    fn tmp_path(&self, section: u32) -> PathBuf {
        self.dir.join(format!("tafsir_{section}.json.tmp"))
    }

    pub fn exists(&self, section: u32) -> bool {
        self.path(section).is_file()
    }

    /// Stored size in bytes, if the document exists.
    pub fn file_size(&self, section: u32) -> Option<u64> {
        fs::metadata(self.path(section)).ok().map(|m| m.len())
    }

    /// Load a section's document; a missing file is an empty document.
    ///
    /// A file that exists but does not parse is an error: saving over it
    /// would lose whatever it still holds.
    pub fn load(&self, section: u32) -> Result<Document> {
        let path = self.path(section);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no document for section {section} yet");
                return Ok(Document::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        Document::from_json(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Write to `<file>.tmp`, fsync, then rename over the final path.
    ///
    /// Readers see either the previous version or the new one.
    pub fn save(&self, section: u32, doc: &Document) -> Result<()> {
        let final_path = self.path(section);
        let tmp_path = self.tmp_path(section);
        let json = doc
            .to_json_pretty()
            .with_context(|| format!("failed to serialize section {section}"))?;

        let mut file = File::create(&tmp_path)
            .with_context(|| format!("failed to create {}", tmp_path.display()))?;
        file.write_all(json.as_bytes())
            .and_then(|()| file.sync_all())
            .with_context(|| format!("failed to write {}", tmp_path.display()))?;
        drop(file);

        fs::rename(&tmp_path, &final_path).with_context(|| {
            format!(
                "failed to rename {} → {}",
                tmp_path.display(),
                final_path.display()
            )
        })?;
        log::debug!("saved {}", final_path.display());
        Ok(())
    }

    /// Section numbers with a stored document, ascending.
    pub fn list_sections(&self) -> Result<Vec<u32>> {
        let pattern = self.dir.join("tafsir_*.json");
        let pattern_str = pattern.to_string_lossy();

        let mut sections: Vec<u32> = glob::glob(&pattern_str)
            .context("invalid glob pattern")?
            .filter_map(|e| e.ok())
            .filter_map(|p| {
                p.file_stem()?
                    .to_str()?
                    .strip_prefix("tafsir_")?
                    .parse()
                    .ok()
            })
            .collect();
        sections.sort_unstable();
        Ok(sections)
    }

    /// Remove leftovers of interrupted saves.
    pub fn cleanup_tmp_files(&self) -> Result<usize> {
        cleanup_tmp_files(&self.dir)
            .with_context(|| format!("failed to clean tmp files in {}", self.dir.display()))
    }
}

/// Remove stale `.tmp` files in `dir`. Returns how many were removed.
pub fn cleanup_tmp_files(dir: &Path) -> std::io::Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
            count += 1;
        }
    }
    Ok(count)
}
