//! Per-section translation in child processes with a wall-clock limit
//!
//! Each section runs as `<program> <args..> translate --lang <code>
//! --section <n>`. A child that outlives the limit is killed and the batch
//! moves on; this is the only place an in-flight call can be cancelled.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tafsir_core::{RunLog, SHARED_RUNTIME, fmt_duration, shutdown_flag};
use tafsir_store::DocumentStore;

use crate::layer::Variant;
use crate::unit_space::validate_range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionOutcome {
    Success,
    /// Child exited non-zero (`None`: killed by a signal)
    Failed(Option<i32>),
    /// Wall-clock limit hit; transient, the section can be rerun
    Timeout,
    /// No document to translate
    Skipped,
}

impl SectionOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed(_) => "FAILED",
            Self::Timeout => "TIMEOUT",
            Self::Skipped => "SKIPPED",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<(u32, SectionOutcome, Duration)>,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn count(&self, pred: impl Fn(&SectionOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o, _)| pred(o)).count()
    }

    /// No section failed or timed out, and the batch ran to the end.
    pub fn is_success(&self) -> bool {
        !self.interrupted
            && self
                .outcomes
                .iter()
                .all(|(_, o, _)| matches!(o, SectionOutcome::Success | SectionOutcome::Skipped))
    }
}

pub struct TranslateBatch<'a> {
    store: &'a DocumentStore,
    program: PathBuf,
    base_args: Vec<OsString>,
    child_args: Vec<OsString>,
    child_env: Vec<(OsString, OsString)>,
    variant: &'static Variant,
    timeout: Duration,
    run_log: RunLog,
    stop: &'a AtomicBool,
}

impl<'a> TranslateBatch<'a> {
    /// `base_args` go before the `translate` subcommand (global flags).
    pub fn new(
        store: &'a DocumentStore,
        program: PathBuf,
        base_args: Vec<OsString>,
        variant: &'static Variant,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            program,
            base_args,
            child_args: Vec::new(),
            child_env: Vec::new(),
            variant,
            timeout,
            run_log: RunLog::disabled(),
            stop: shutdown_flag(),
        }
    }

    /// Extra flags appended after `--section <n>`.
    pub fn with_child_args(mut self, args: Vec<OsString>) -> Self {
        self.child_args = args;
        self
    }

    /// Variables set on every child on top of the inherited environment.
    pub fn with_child_env(mut self, env: Vec<(OsString, OsString)>) -> Self {
        self.child_env = env;
        self
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = run_log;
        self
    }

    pub fn with_stop_flag(mut self, stop: &'a AtomicBool) -> Self {
        self.stop = stop;
        self
    }

    pub fn run(&mut self, start: u32, end: u32) -> Result<BatchReport> {
        validate_range(start, end)?;
        let started = Instant::now();
        let total = (end - start + 1) as usize;
        let mut report = BatchReport::default();
        let mut timed = Vec::new();

        log::info!(
            "translating sections {start}-{end} to {} with {}s limit per section",
            self.variant.language,
            self.timeout.as_secs()
        );
        self.run_log.line(format!(
            "START translate-batch {} sections {start}-{end}",
            self.variant.code
        ));

        for (i, section) in (start..=end).enumerate() {
            if self.stop.load(Ordering::Relaxed) {
                report.interrupted = true;
                break;
            }
            let t0 = Instant::now();
            let outcome = if self.store.exists(section) {
                self.run_child(section)?
            } else {
                SectionOutcome::Skipped
            };
            let elapsed = t0.elapsed();

            if outcome != SectionOutcome::Skipped {
                timed.push(elapsed);
            }
            let remaining = total - i - 1;
            let eta = average(&timed).map(|avg| avg.saturating_mul(remaining as u32));
            let line = format!(
                "{:<8} section {section} in {} ({}/{total}, eta {})",
                outcome.label(),
                fmt_duration(elapsed),
                i + 1,
                eta.map_or_else(|| "-".to_string(), fmt_duration)
            );
            match outcome {
                SectionOutcome::Success | SectionOutcome::Skipped => log::info!("{line}"),
                SectionOutcome::Failed(_) | SectionOutcome::Timeout => log::error!("{line}"),
            }
            self.run_log.line(&line);
            report.outcomes.push((section, outcome, elapsed));
        }

        report.elapsed = started.elapsed();
        self.run_log.line(format!(
            "END success={} failed={} timeout={} skipped={} elapsed={}",
            report.count(|o| *o == SectionOutcome::Success),
            report.count(|o| matches!(o, SectionOutcome::Failed(_))),
            report.count(|o| *o == SectionOutcome::Timeout),
            report.count(|o| *o == SectionOutcome::Skipped),
            fmt_duration(report.elapsed)
        ));
        Ok(report)
    }

    fn run_child(&mut self, section: u32) -> Result<SectionOutcome> {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.base_args)
            .arg("translate")
            .arg("--lang")
            .arg(self.variant.code)
            .arg("--section")
            .arg(section.to_string())
            .args(&self.child_args)
            .envs(self.child_env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        log::debug!("spawning {} for section {section}", self.program.display());

        let limit = self.timeout;
        let waited = SHARED_RUNTIME.block_on(async move {
            let child = cmd.spawn()?;
            // dropping the future on timeout drops the child, which kills it
            Ok::<_, std::io::Error>(tokio::time::timeout(limit, child.wait_with_output()).await)
        });
        let waited = waited
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;

        let outcome = match waited {
            Err(_elapsed) => SectionOutcome::Timeout,
            Ok(Err(e)) => {
                return Err(e).with_context(|| format!("waiting for section {section} child"));
            }
            Ok(Ok(output)) => {
                self.run_log.line(format!("section {section} output:"));
                self.run_log.block(&String::from_utf8_lossy(&output.stdout));
                self.run_log.block(&String::from_utf8_lossy(&output.stderr));
                if output.status.success() {
                    SectionOutcome::Success
                } else {
                    SectionOutcome::Failed(output.status.code())
                }
            }
        };
        Ok(outcome)
    }
}

fn average(samples: &[Duration]) -> Option<Duration> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<Duration>() / samples.len() as u32)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::layer::variant;
    use tafsir_store::Document;
    use tempfile::TempDir;

    /// `sh -c <script> translate --lang fr --section N`: `$4` is the section.
    fn batch<'a>(store: &'a DocumentStore, script: &str, timeout: Duration) -> TranslateBatch<'a> {
        static NEVER: AtomicBool = AtomicBool::new(false);
        TranslateBatch::new(
            store,
            PathBuf::from("sh"),
            vec!["-c".into(), script.into()],
            variant("fr").unwrap(),
            timeout,
        )
        .with_stop_flag(&NEVER)
    }

    fn store_with(sections: &[u32]) -> (TempDir, DocumentStore) {
        let dir = TempDir::new().unwrap();
        let store = DocumentStore::new(dir.path()).unwrap();
        for &s in sections {
            store.save(s, &Document::new()).unwrap();
        }
        (dir, store)
    }

    #[test]
    fn classifies_child_outcomes() {
        let (_dir, store) = store_with(&[1, 2, 4]);
        let script = r#"case "$4" in 2) exit 3;; 4) sleep 5;; esac; exit 0"#;
        let report = batch(&store, script, Duration::from_millis(500))
            .run(1, 4)
            .unwrap();

        let outcomes: Vec<_> = report.outcomes.iter().map(|(s, o, _)| (*s, *o)).collect();
        assert_eq!(
            outcomes,
            vec![
                (1, SectionOutcome::Success),
                (2, SectionOutcome::Failed(Some(3))),
                (3, SectionOutcome::Skipped),
                (4, SectionOutcome::Timeout),
            ]
        );
        assert!(!report.is_success());
    }

    #[test]
    fn all_success_or_skipped_is_success() {
        let (_dir, store) = store_with(&[1]);
        let report = batch(&store, "exit 0", Duration::from_secs(10))
            .run(1, 2)
            .unwrap();
        assert!(report.is_success());
        assert_eq!(report.count(|o| *o == SectionOutcome::Skipped), 1);
    }

    #[test]
    fn child_output_goes_to_run_log() {
        let (dir, store) = store_with(&[1]);
        let log = RunLog::create(dir.path(), "translation_log_fr", "txt").unwrap();
        let path = log.path().unwrap().to_path_buf();
        batch(&store, "echo translated section $4", Duration::from_secs(10))
            .with_run_log(log)
            .run(1, 1)
            .unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("    translated section 1"));
        assert!(text.contains("SUCCESS  section 1"));
    }

    #[test]
    fn child_args_follow_section() {
        let (dir, store) = store_with(&[1]);
        let log = RunLog::create(dir.path(), "translation_log_fr", "txt").unwrap();
        let path = log.path().unwrap().to_path_buf();
        batch(&store, "echo provider $6", Duration::from_secs(10))
            .with_child_args(vec!["--provider".into(), "deepseek".into()])
            .with_run_log(log)
            .run(1, 1)
            .unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("provider deepseek"));
    }

    #[test]
    fn child_env_reaches_child() {
        let (dir, store) = store_with(&[1]);
        let log = RunLog::create(dir.path(), "translation_log_fr", "txt").unwrap();
        let path = log.path().unwrap().to_path_buf();
        batch(&store, "echo key=$TAFSIR_CHILD_TEST_KEY", Duration::from_secs(10))
            .with_child_env(vec![("TAFSIR_CHILD_TEST_KEY".into(), "sk-parent".into())])
            .with_run_log(log)
            .run(1, 1)
            .unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("key=sk-parent"));
    }

    #[test]
    fn bad_range_rejected() {
        let (_dir, store) = store_with(&[]);
        assert!(batch(&store, "exit 0", Duration::from_secs(1)).run(3, 1).is_err());
    }
}
