//! Corpus size totals and per-section outliers

use serde::Serialize;

use crate::check::SectionReport;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeOutlier {
    pub section: u32,
    pub bytes: u64,
    pub bytes_per_sub_unit: f64,
    /// Section density over corpus density
    pub ratio: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SizeAudit {
    pub file_count: usize,
    pub total_bytes: u64,
    pub average_bytes: u64,
    pub bytes_per_sub_unit: f64,
    pub outliers: Vec<SizeOutlier>,
}

impl SizeAudit {
    /// Sections are compared by bytes per sub-unit, so long and short
    /// sections are judged on the same scale. A section is an outlier when
    /// its density is more than `factor` times above or below the average.
    pub fn compute(reports: &[SectionReport], factor: f64) -> Self {
        let sized: Vec<&SectionReport> = reports.iter().filter(|r| r.is_valid()).collect();
        let file_count = reports.iter().filter(|r| r.exists).count();
        let total_bytes: u64 = reports.iter().filter(|r| r.exists).map(|r| r.bytes).sum();
        let average_bytes = if file_count == 0 {
            0
        } else {
            total_bytes / file_count as u64
        };

        let dense: Vec<&&SectionReport> = sized.iter().filter(|r| r.sub_units > 0).collect();
        let dense_bytes: u64 = dense.iter().map(|r| r.bytes).sum();
        let dense_units: usize = dense.iter().map(|r| r.sub_units).sum();
        let bytes_per_sub_unit = if dense_units == 0 {
            0.0
        } else {
            dense_bytes as f64 / dense_units as f64
        };

        let outliers = if bytes_per_sub_unit > 0.0 && factor > 1.0 {
            dense
                .iter()
                .filter_map(|r| {
                    let density = r.bytes as f64 / r.sub_units as f64;
                    let ratio = density / bytes_per_sub_unit;
                    (ratio > factor || ratio < 1.0 / factor).then(|| SizeOutlier {
                        section: r.section,
                        bytes: r.bytes,
                        bytes_per_sub_unit: density,
                        ratio,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            file_count,
            total_bytes,
            average_bytes,
            bytes_per_sub_unit,
            outliers,
        }
    }

    /// Operator advice for the corpus as a whole.
    pub fn recommendations(&self, expected_files: usize) -> Vec<String> {
        let mut out = Vec::new();
        if self.total_bytes > 100 * MIB {
            out.push(format!(
                "Corpus is {:.1} MB - consider compressing documents for distribution",
                self.total_bytes as f64 / MIB as f64
            ));
        }
        if self.average_bytes > 2 * MIB {
            out.push(format!(
                "Average document is {:.1} MB - consider splitting large sections",
                self.average_bytes as f64 / MIB as f64
            ));
        }
        if self.file_count < expected_files {
            out.push(format!(
                "Missing {} tafsir files - generation incomplete",
                expected_files - self.file_count
            ));
        }
        if !self.outliers.is_empty() {
            let list: Vec<String> = self.outliers.iter().map(|o| o.section.to_string()).collect();
            out.push(format!(
                "Sections {} deviate sharply from the average size - inspect for truncation \
                 or duplication",
                list.join(", ")
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(section: u32, bytes: u64, sub_units: usize) -> SectionReport {
        SectionReport {
            section,
            exists: true,
            bytes,
            sub_units,
            ..Default::default()
        }
    }

    #[test]
    fn normalises_by_sub_unit() {
        // 7 and 286 sub-units at the same density: no outlier
        let reports = vec![report(1, 7_000, 7), report(2, 286_000, 286), report(3, 4_000, 4)];
        let audit = SizeAudit::compute(&reports, 3.0);
        assert!(audit.outliers.is_empty());
        assert!((audit.bytes_per_sub_unit - 1000.0).abs() < 1e-9);
        assert_eq!(audit.total_bytes, 297_000);
        assert_eq!(audit.file_count, 3);
    }

    #[test]
    fn flags_dense_and_sparse_sections() {
        let mut reports: Vec<_> = (1..=10).map(|s| report(s, 10_000, 10)).collect();
        reports.push(report(11, 100_000, 10));
        reports.push(report(12, 500, 10));
        let audit = SizeAudit::compute(&reports, 3.0);
        let flagged: Vec<_> = audit.outliers.iter().map(|o| o.section).collect();
        assert_eq!(flagged, vec![11, 12]);
    }

    #[test]
    fn missing_files_recommended() {
        let audit = SizeAudit::compute(&[report(1, 100, 1)], 3.0);
        let recs = audit.recommendations(114);
        assert_eq!(recs, vec!["Missing 113 tafsir files - generation incomplete"]);
    }

    #[test]
    fn large_corpus_recommendations() {
        let audit = SizeAudit {
            file_count: 40,
            total_bytes: 120 * MIB,
            average_bytes: 3 * MIB,
            ..Default::default()
        };
        let recs = audit.recommendations(40);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].contains("compressing"));
        assert!(recs[1].contains("splitting"));
    }

    #[test]
    fn empty_corpus() {
        let audit = SizeAudit::compute(&[], 3.0);
        assert_eq!(audit.average_bytes, 0);
        assert!(audit.outliers.is_empty());
    }
}
