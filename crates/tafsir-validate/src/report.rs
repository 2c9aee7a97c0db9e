//! Machine-readable validation report

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::check::{AnomalyKind, SectionReport};
use crate::size_audit::SizeAudit;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationTotals {
    pub sections_checked: usize,
    pub missing: usize,
    pub unparsable: usize,
    pub incomplete: usize,
    pub complete: usize,
    pub incomplete_sub_units: usize,
    pub too_short: usize,
    pub too_long: usize,
    pub failure_sentinels: usize,
}

impl ValidationTotals {
    pub fn from_reports(reports: &[SectionReport]) -> Self {
        let mut t = Self {
            sections_checked: reports.len(),
            ..Default::default()
        };
        for r in reports {
            if !r.exists {
                t.missing += 1;
            } else if r.parse_error.is_some() {
                t.unparsable += 1;
            } else if r.incomplete.is_empty() {
                t.complete += 1;
            } else {
                t.incomplete += 1;
            }
            t.incomplete_sub_units += r.incomplete.len();
            for a in &r.anomalies {
                match a.kind {
                    AnomalyKind::TooShort => t.too_short += 1,
                    AnomalyKind::TooLong => t.too_long += 1,
                    AnomalyKind::FailureSentinel => t.failure_sentinels += 1,
                }
            }
        }
        t
    }
}

/// Snapshot of one validation run. Built fresh each time, never stored back
/// into documents.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub generated_at: chrono::DateTime<chrono::Local>,
    pub start: u32,
    pub end: u32,
    pub totals: ValidationTotals,
    pub size: SizeAudit,
    pub recommendations: Vec<String>,
    /// Anomaly counts per layer key, e.g. `layer3` → 4
    pub anomalies_by_key: BTreeMap<String, usize>,
    pub sections: Vec<SectionReport>,
}

impl ValidationReport {
    pub fn build(start: u32, end: u32, sections: Vec<SectionReport>, size_factor: f64) -> Self {
        let totals = ValidationTotals::from_reports(&sections);
        let size = SizeAudit::compute(&sections, size_factor);
        let mut recommendations = size.recommendations(sections.len());
        if totals.failure_sentinels > 0 {
            recommendations.push(format!(
                "{} failed values stored - rerun generation with --retry-failed",
                totals.failure_sentinels
            ));
        }
        if totals.incomplete > 0 {
            recommendations.push(format!(
                "{} sections incomplete ({} sub-units) - rerun generation to fill missing layers",
                totals.incomplete, totals.incomplete_sub_units
            ));
        }

        let mut anomalies_by_key = BTreeMap::new();
        for a in sections.iter().flat_map(|s| &s.anomalies) {
            *anomalies_by_key.entry(a.key.clone()).or_insert(0) += 1;
        }

        Self {
            generated_at: chrono::Local::now(),
            start,
            end,
            totals,
            size,
            recommendations,
            anomalies_by_key,
            sections,
        }
    }

    /// Every section present, parsable and complete.
    pub fn is_success(&self) -> bool {
        let t = &self.totals;
        t.missing == 0 && t.unparsable == 0 && t.incomplete == 0
    }

    /// Write `validation_report_<timestamp>.json` into `dir`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let ts = self.generated_at.format(tafsir_core::TIMESTAMP_FORMAT);
        let path = dir.join(format!("validation_report_{ts}.json"));
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}
