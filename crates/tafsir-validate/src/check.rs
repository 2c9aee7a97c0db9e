//! Structural and quality checks over stored section documents

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde::Serialize;
use tafsir_generate::ReferenceCorpus;
use tafsir_store::{Document, DocumentStore, LayerKey, is_failure_sentinel, parse_layer_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    TooShort,
    TooLong,
    FailureSentinel,
}

/// One flagged value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub sub_unit: u32,
    pub key: String,
    pub kind: AnomalyKind,
    pub chars: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionReport {
    pub section: u32,
    pub exists: bool,
    pub parse_error: Option<String>,
    pub bytes: u64,
    pub sub_units: usize,
    /// Sub-unit → required layers with no usable content
    pub incomplete: BTreeMap<u32, Vec<u8>>,
    pub anomalies: Vec<Anomaly>,
}

impl SectionReport {
    pub fn is_valid(&self) -> bool {
        self.parse_error.is_none() && self.exists
    }

    pub fn is_complete(&self) -> bool {
        self.is_valid() && self.incomplete.is_empty()
    }
}

/// Read-only validator. Never writes to the store.
#[derive(Debug, Clone)]
pub struct ValidationPass<'a> {
    pub min_chars: usize,
    pub max_chars: usize,
    pub required_layers: Vec<u8>,
    corpus: Option<&'a ReferenceCorpus>,
}

impl Default for ValidationPass<'_> {
    fn default() -> Self {
        Self {
            min_chars: 100,
            max_chars: 2000,
            required_layers: vec![1, 2, 3, 4],
            corpus: None,
        }
    }
}

impl<'a> ValidationPass<'a> {
    /// Also report sub-units the corpus knows but the document lacks.
    pub fn with_corpus(mut self, corpus: &'a ReferenceCorpus) -> Self {
        self.corpus = Some(corpus);
        self
    }

    pub fn check_section(&self, store: &DocumentStore, section: u32) -> SectionReport {
        let mut report = SectionReport {
            section,
            ..Default::default()
        };
        if !store.exists(section) {
            return report;
        }
        report.exists = true;
        report.bytes = store.file_size(section).unwrap_or(0);

        match store.load(section) {
            Ok(doc) => self.check_document(section, &doc, &mut report),
            Err(e) => {
                log::warn!("section {section}: {e:#}");
                report.parse_error = Some(format!("{e:#}"));
            }
        }
        report
    }

    pub fn check_document(&self, section: u32, doc: &Document, report: &mut SectionReport) {
        let mut ids: BTreeSet<u32> = doc.sub_unit_ids().into_iter().collect();
        report.sub_units = ids.len();

        if let Some(expected) = self.corpus.and_then(|c| c.section(section)) {
            ids.extend(expected.sub_units.iter().map(|u| u.number));
        }

        for sub in ids {
            let missing: Vec<u8> = self
                .required_layers
                .iter()
                .copied()
                .filter(|&l| {
                    !doc.get(sub, &LayerKey::base(l))
                        .is_some_and(|v| !v.trim().is_empty() && !is_failure_sentinel(v))
                })
                .collect();
            if !missing.is_empty() {
                report.incomplete.insert(sub, missing);
            }
            self.check_values(sub, doc, &mut report.anomalies);
        }
    }

    fn check_values(&self, sub: u32, doc: &Document, out: &mut Vec<Anomaly>) {
        let Some(map) = doc.sub_unit(sub) else {
            return;
        };
        for (key, value) in map {
            let Some((_, suffix)) = parse_layer_key(key) else {
                continue;
            };
            let Some(text) = value.as_str() else {
                continue;
            };
            let chars = text.trim().chars().count();
            let kind = if is_failure_sentinel(text) {
                Some(AnomalyKind::FailureSentinel)
            } else if suffix.is_some() {
                // translated lengths do not follow the English band
                None
            } else if chars < self.min_chars {
                Some(AnomalyKind::TooShort)
            } else if chars > self.max_chars {
                Some(AnomalyKind::TooLong)
            } else {
                None
            };
            if let Some(kind) = kind {
                out.push(Anomaly {
                    sub_unit: sub,
                    key: key.clone(),
                    kind,
                    chars,
                });
            }
        }
    }

    /// Check every section of `start..=end`.
    pub fn run(&self, store: &DocumentStore, start: u32, end: u32) -> Result<Vec<SectionReport>> {
        tafsir_generate::validate_range(start, end)?;
        Ok((start..=end)
            .map(|s| self.check_section(store, s))
            .collect())
    }
}
