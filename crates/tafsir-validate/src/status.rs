//! Progress monitor over the stored corpus

use anyhow::Result;
use serde::Serialize;
use tafsir_generate::ReferenceCorpus;
use tafsir_store::{Document, DocumentStore, LayerKey};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionStatus {
    pub section: u32,
    pub exists: bool,
    pub readable: bool,
    pub sub_units: usize,
    /// Sub-units with every required layer filled
    pub complete: usize,
    /// Sub-unit count from the reference corpus, when known
    pub expected: Option<usize>,
    pub bytes: u64,
}

impl SectionStatus {
    pub fn is_done(&self) -> bool {
        self.readable && self.expected.map_or(self.sub_units, |e| e) == self.complete
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusStatus {
    pub rows: Vec<SectionStatus>,
    pub files: usize,
    pub sub_units: usize,
    pub complete: usize,
    pub bytes: u64,
    /// Estimated size once every sub-unit in range is complete
    pub projected_bytes: Option<u64>,
}

impl CorpusStatus {
    /// Scan `start..=end`. Unreadable documents are reported, not fatal.
    pub fn collect(
        store: &DocumentStore,
        start: u32,
        end: u32,
        required_layers: &[u8],
        corpus: Option<&ReferenceCorpus>,
    ) -> Result<Self> {
        tafsir_generate::validate_range(start, end)?;
        let rows = (start..=end)
            .map(|section| {
                let mut row = SectionStatus {
                    section,
                    expected: corpus
                        .and_then(|c| c.section(section))
                        .map(|s| s.sub_units.len()),
                    ..Default::default()
                };
                if !store.exists(section) {
                    return row;
                }
                row.exists = true;
                row.bytes = store.file_size(section).unwrap_or(0);
                match store.load(section) {
                    Ok(doc) => {
                        row.readable = true;
                        row.sub_units = doc.sub_unit_ids().len();
                        row.complete = complete_sub_units(&doc, required_layers);
                    }
                    Err(e) => log::warn!("section {section}: {e:#}"),
                }
                row
            })
            .collect();
        Ok(Self::from_rows(rows))
    }

    pub fn from_rows(rows: Vec<SectionStatus>) -> Self {
        let files = rows.iter().filter(|r| r.exists).count();
        let sub_units = rows.iter().map(|r| r.sub_units).sum();
        let complete = rows.iter().map(|r| r.complete).sum();
        let bytes = rows.iter().map(|r| r.bytes).sum();
        let projected_bytes = project(&rows, complete, bytes, files);
        Self {
            rows,
            files,
            sub_units,
            complete,
            bytes,
            projected_bytes,
        }
    }

    pub fn percent(&self) -> f64 {
        let target = self.target_sub_units();
        if target == 0 {
            return 0.0;
        }
        self.complete as f64 * 100.0 / target as f64
    }

    /// Expected sub-units where the corpus knows them, present ones otherwise.
    pub fn target_sub_units(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.expected.unwrap_or(r.sub_units))
            .sum()
    }
}

fn complete_sub_units(doc: &Document, required_layers: &[u8]) -> usize {
    doc.sub_unit_ids()
        .into_iter()
        .filter(|&sub| {
            required_layers
                .iter()
                .all(|&l| doc.has_key(sub, &LayerKey::base(l)) && !is_failed(doc, sub, l))
        })
        .count()
}

fn is_failed(doc: &Document, sub: u32, layer: u8) -> bool {
    doc.get(sub, &LayerKey::base(layer))
        .is_some_and(tafsir_store::is_failure_sentinel)
}

// Density of finished work times the sub-units the range should hold; falls
// back to the average file size when nothing is complete yet.
fn project(rows: &[SectionStatus], complete: usize, bytes: u64, files: usize) -> Option<u64> {
    let target: usize = rows.iter().map(|r| r.expected.unwrap_or(r.sub_units)).sum();
    if complete > 0 && target > 0 {
        let per_unit = bytes as f64 / complete as f64;
        return Some((per_unit * target as f64).round() as u64);
    }
    if files > 0 {
        return Some(bytes / files as u64 * rows.len() as u64);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn doc(subs: u32, layers: u8) -> Document {
        let mut doc = Document::new();
        for sub in 1..=subs {
            for l in 1..=layers {
                doc.put(sub, &LayerKey::base(l), "commentary text");
            }
        }
        doc
    }

    #[test]
    fn counts_complete_sub_units() {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path()).unwrap();
        store.save(1, &doc(3, 4)).unwrap();
        store.save(2, &doc(2, 2)).unwrap();

        let status = CorpusStatus::collect(&store, 1, 3, &[1, 2, 3, 4], None).unwrap();
        assert_eq!(status.files, 2);
        assert_eq!(status.sub_units, 5);
        assert_eq!(status.complete, 3);
        assert!(status.rows[0].is_done());
        assert!(!status.rows[1].is_done());
        assert!(!status.rows[2].exists);
    }

    #[test]
    fn failed_values_are_not_complete() {
        let mut d = doc(1, 3);
        d.put(1, &LayerKey::base(4), "Error generating layer 4 for verse 1: x");
        assert_eq!(complete_sub_units(&d, &[1, 2, 3, 4]), 0);
    }

    #[test]
    fn projection_scales_by_expected_sub_units() {
        let rows = vec![
            SectionStatus {
                section: 1,
                exists: true,
                readable: true,
                sub_units: 10,
                complete: 10,
                expected: Some(10),
                bytes: 10_000,
            },
            SectionStatus {
                section: 2,
                expected: Some(30),
                ..Default::default()
            },
        ];
        let status = CorpusStatus::from_rows(rows);
        assert_eq!(status.projected_bytes, Some(40_000));
        assert!((status.percent() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn projection_from_average_file_when_nothing_complete() {
        let rows = vec![
            SectionStatus {
                section: 1,
                exists: true,
                readable: true,
                sub_units: 2,
                bytes: 600,
                ..Default::default()
            },
            SectionStatus {
                section: 2,
                ..Default::default()
            },
        ];
        assert_eq!(CorpusStatus::from_rows(rows).projected_bytes, Some(1200));
    }
}
