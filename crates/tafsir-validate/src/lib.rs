//! tafsir-validate: read-only checks over generated section documents
//!
//! Structural completeness, per-value length anomalies, a size audit
//! normalised by sub-unit count, and the progress monitor behind `status`.

pub mod check;
pub mod report;
pub mod size_audit;
pub mod status;

pub use check::{Anomaly, AnomalyKind, SectionReport, ValidationPass};
pub use report::{ValidationReport, ValidationTotals};
pub use size_audit::{SizeAudit, SizeOutlier};
pub use status::{CorpusStatus, SectionStatus};
