//! Human-readable per-run log file

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::progress::{fmt_duration, TaskOutcome};

/// Timestamp format shared by run logs and reports
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `<prefix>_<YYYYmmdd_HHMMSS>.<ext>`
pub fn timestamped_name(prefix: &str, ext: &str) -> String {
    let ts = chrono::Local::now().format(TIMESTAMP_FORMAT);
    format!("{prefix}_{ts}.{ext}")
}

/// Line-oriented log of one batch run.
///
/// Every line is flushed immediately so an interrupted run keeps its record.
/// A disabled log swallows writes.
#[derive(Debug)]
pub struct RunLog {
    out: Option<BufWriter<File>>,
    path: Option<PathBuf>,
}

impl RunLog {
    /// Create `<dir>/<prefix>_<timestamp>.<ext>`, creating `dir` if needed.
    pub fn create(dir: &Path, prefix: &str, ext: &str) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(timestamped_name(prefix, ext));
        let file = File::create(&path)?;
        log::info!("Run log: {}", path.display());
        Ok(Self {
            out: Some(BufWriter::new(file)),
            path: Some(path),
        })
    }

    pub fn disabled() -> Self {
        Self {
            out: None,
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Free-form line, prefixed with the wall-clock time.
    pub fn line(&mut self, msg: impl AsRef<str>) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let res = writeln!(out, "[{now}] {}", msg.as_ref()).and_then(|()| out.flush());
        if let Err(e) = res {
            log::warn!("run log write failed, disabling: {e}");
            self.out = None;
        }
    }

    /// Captured output, written verbatim and indented.
    pub fn block(&mut self, text: &str) {
        let Some(out) = self.out.as_mut() else {
            return;
        };
        let res = text
            .lines()
            .try_for_each(|l| writeln!(out, "    {l}"))
            .and_then(|()| out.flush());
        if let Err(e) = res {
            log::warn!("run log write failed, disabling: {e}");
            self.out = None;
        }
    }

    /// `OK|FAILED|SKIPPED section:sub key elapsed [detail]`
    pub fn unit(
        &mut self,
        outcome: TaskOutcome,
        section: u32,
        sub_unit: u32,
        key: &str,
        elapsed: Duration,
        detail: Option<&str>,
    ) {
        let status = match outcome {
            TaskOutcome::Completed => "OK",
            TaskOutcome::Failed => "FAILED",
            TaskOutcome::Skipped => "SKIPPED",
        };
        let mut msg = format!(
            "{status:<7} {section}:{sub_unit} {key} {}",
            fmt_duration(elapsed)
        );
        if let Some(detail) = detail {
            msg.push_str(" ");
            msg.push_str(detail);
        }
        self.line(msg);
    }
}
