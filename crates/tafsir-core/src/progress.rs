//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: indicatif bars per section (cleared on completion).
//! Non-TTY mode: log-based output only.

use std::collections::VecDeque;
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Per-section task bar
fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix:<14.dim} {bar:30.green/dim} {pos:>5}/{len:5} {wide_msg:.dim}")
        .expect("invalid template")
        .progress_chars("--")
}

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        let is_tty = std::io::stderr().is_terminal();
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Task bar for one section. Hidden outside a TTY.
    pub fn section_bar(&self, name: &str, total: u64) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(bar_style());
        let display: String = name.chars().take(14).collect();
        pb.set_prefix(display);
        pb
    }

    /// Spinner status line for a long stage.
    pub fn stage_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {prefix:<10.cyan.bold} {wide_msg}")
                .expect("invalid template"),
        );
        pb.set_prefix(name.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// `MultiProgress` for the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedProgress = Arc<ProgressContext>;

/// How a single task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed,
    Skipped,
}

/// Window of recent task durations used for the ETA
const ETA_WINDOW: usize = 20;

/// Append-only counters for a run plus a moving-average ETA.
///
/// Skipped tasks never hit the provider, so they do not enter the average.
#[derive(Debug)]
pub struct ProgressReporter {
    total: usize,
    completed: usize,
    failed: usize,
    skipped: usize,
    recent: VecDeque<Duration>,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: 0,
            failed: 0,
            skipped: 0,
            recent: VecDeque::with_capacity(ETA_WINDOW),
        }
    }

    pub fn record(&mut self, outcome: TaskOutcome, elapsed: Duration) {
        match outcome {
            TaskOutcome::Completed => self.completed += 1,
            TaskOutcome::Failed => self.failed += 1,
            TaskOutcome::Skipped => {
                self.skipped += 1;
                return;
            }
        }
        if self.recent.len() == ETA_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(elapsed);
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn processed(&self) -> usize {
        self.completed + self.failed + self.skipped
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed())
    }

    /// Share of tasks handled, 0.0..=100.0. An empty run is complete.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.processed().min(self.total) as f64 / self.total as f64) * 100.0
    }

    /// Average of the recent window, if any timed task has finished.
    pub fn average(&self) -> Option<Duration> {
        if self.recent.is_empty() {
            return None;
        }
        let sum: Duration = self.recent.iter().sum();
        Some(sum / self.recent.len() as u32)
    }

    /// Projected time for the remaining tasks.
    pub fn eta(&self) -> Option<Duration> {
        self.average()
            .map(|avg| avg.saturating_mul(self.remaining() as u32))
    }

    /// One-line status: `42/120 (35.0%) ok=40 failed=1 skipped=1 eta 3m 10s`
    pub fn status_line(&self) -> String {
        let eta = self
            .eta()
            .map_or_else(|| "-".to_string(), fmt_duration);
        format!(
            "{}/{} ({:.1}%) ok={} failed={} skipped={} eta {eta}",
            fmt_num(self.processed()),
            fmt_num(self.total),
            self.percent(),
            self.completed,
            self.failed,
            self.skipped,
        )
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Compact human duration: `850ms`, `12.3s`, `4m 05s`, `2h 03m`
pub fn fmt_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else if d.as_millis() >= 1000 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}ms", d.as_millis())
    }
}

/// Human-readable byte size (binary units)
pub fn fmt_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_num_zero() {
        assert_eq!(fmt_num(0), "0");
    }

    #[test]
    fn fmt_num_thousands() {
        assert_eq!(fmt_num(1_000), "1,000");
        assert_eq!(fmt_num(123_456), "123,456");
        assert_eq!(fmt_num(1_234_567), "1,234,567");
    }

    #[test]
    fn fmt_duration_ranges() {
        assert_eq!(fmt_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(fmt_duration(Duration::from_millis(12_300)), "12.3s");
        assert_eq!(fmt_duration(Duration::from_secs(245)), "4m 05s");
        assert_eq!(fmt_duration(Duration::from_secs(7380)), "2h 03m");
    }

    #[test]
    fn fmt_bytes_units() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KiB");
        assert_eq!(fmt_bytes(3 * 1024 * 1024), "3.0 MiB");
    }

    #[test]
    fn reporter_counts_and_percent() {
        let mut r = ProgressReporter::new(4);
        r.record(TaskOutcome::Completed, Duration::from_secs(2));
        r.record(TaskOutcome::Skipped, Duration::ZERO);
        assert_eq!(r.processed(), 2);
        assert_eq!(r.percent(), 50.0);
        r.record(TaskOutcome::Failed, Duration::from_secs(4));
        r.record(TaskOutcome::Completed, Duration::from_secs(3));
        assert_eq!(r.percent(), 100.0);
        assert_eq!((r.completed(), r.failed(), r.skipped()), (2, 1, 1));
    }

    #[test]
    fn eta_uses_moving_average_of_timed_tasks() {
        let mut r = ProgressReporter::new(10);
        assert_eq!(r.eta(), None);
        r.record(TaskOutcome::Completed, Duration::from_secs(2));
        r.record(TaskOutcome::Completed, Duration::from_secs(4));
        r.record(TaskOutcome::Skipped, Duration::ZERO);
        // avg 3s, 7 remaining
        assert_eq!(r.eta(), Some(Duration::from_secs(21)));
    }

    #[test]
    fn eta_window_forgets_old_samples() {
        let mut r = ProgressReporter::new(100);
        r.record(TaskOutcome::Completed, Duration::from_secs(100));
        for _ in 0..ETA_WINDOW {
            r.record(TaskOutcome::Completed, Duration::from_secs(1));
        }
        assert_eq!(r.average(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn empty_run_is_complete() {
        assert_eq!(ProgressReporter::new(0).percent(), 100.0);
    }
}
