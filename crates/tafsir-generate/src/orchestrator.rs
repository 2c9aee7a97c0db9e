//! The sequential batch loop: enumerate, skip what exists, call, clean, save
//!
//! One section document is open at a time and it is saved after every
//! write, so an interrupted run resumes from the last finished unit. A unit
//! that fails for good is stored as a sentinel and the run moves on; only
//! storage errors stop the range.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use tafsir_core::{
    ProgressContext, ProgressReporter, ProviderError, RetryPolicy, RunLog, TaskOutcome,
    fmt_duration, shutdown_flag,
};
use tafsir_store::{
    Document, DocumentStore, LayerKey, generation_sentinel, is_failure_sentinel,
    translation_sentinel,
};

use crate::corpus::Section;
use crate::layer::{PromptContext, Variant};
use crate::postprocess::TextPostProcessor;
use crate::provider::Provider;
use crate::unit_space::{GenerationTask, UnitSpace};

/// Switches that change which tasks run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Clear stored sentinels for this run's keys so they are attempted again
    pub retry_failed: bool,
    /// Only touch sections whose documents hold every lower layer
    pub require_lower_layers: bool,
}

/// Totals of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub sections: usize,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Writes made to documents, including sentinels
    pub writes: usize,
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.interrupted
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed + self.failed + self.skipped) as f64 / self.total as f64 * 100.0
    }
}

pub struct BatchOrchestrator<'a, P> {
    space: &'a UnitSpace<'a>,
    store: &'a DocumentStore,
    provider: P,
    post: &'a TextPostProcessor,
    retry: RetryPolicy,
    options: RunOptions,
    progress: Option<&'a ProgressContext>,
    run_log: RunLog,
    stop: &'a AtomicBool,
}

impl<'a, P: Provider> BatchOrchestrator<'a, P> {
    pub fn new(
        space: &'a UnitSpace<'a>,
        store: &'a DocumentStore,
        provider: P,
        post: &'a TextPostProcessor,
    ) -> Self {
        Self {
            space,
            store,
            provider,
            post,
            retry: RetryPolicy::default(),
            options: RunOptions::default(),
            progress: None,
            run_log: RunLog::disabled(),
            stop: shutdown_flag(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, progress: &'a ProgressContext) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = run_log;
        self
    }

    /// Flag polled between units; defaults to the process shutdown flag.
    pub fn with_stop_flag(mut self, stop: &'a AtomicBool) -> Self {
        self.stop = stop;
        self
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Process sections `start..=end`.
    ///
    /// Returns `Err` for a bad range or a storage failure; every provider
    /// failure is folded into the summary instead.
    pub fn run(&mut self, start: u32, end: u32) -> Result<RunSummary> {
        let started = Instant::now();
        let sections = self.space.sections(start, end)?;
        let removed = self.store.cleanup_tmp_files()?;
        if removed > 0 {
            log::warn!("removed {removed} stale tmp file(s) from an earlier run");
        }

        let total = sections
            .iter()
            .map(|s| self.space.tasks_for(s).len())
            .sum();
        let mut reporter = ProgressReporter::new(total);
        let mode = match self.space.variant() {
            Some(v) => format!("translate to {} ({})", v.language, v.code),
            None => "generate".to_string(),
        };
        log::info!(
            "{}: sections {start}-{end}, layers {:?}, {total} tasks via {}",
            mode,
            self.space.layers(),
            self.provider.name()
        );
        self.run_log.line(format!(
            "START {mode} sections {start}-{end} layers {:?} provider {} tasks {total}",
            self.space.layers(),
            self.provider.name()
        ));

        let mut summary = RunSummary::default();
        for section in sections {
            if self.stop_requested() {
                summary.interrupted = true;
                break;
            }
            summary.sections += 1;
            let writes = self
                .run_section(section, &mut reporter)
                .with_context(|| format!("section {} aborted", section.number))?;
            summary.writes += writes;
        }
        summary.interrupted |= self.stop_requested();

        summary.total = reporter.total();
        summary.completed = reporter.completed();
        summary.failed = reporter.failed();
        summary.skipped = reporter.skipped();
        summary.elapsed = started.elapsed();

        self.run_log.line(format!(
            "END completed={} failed={} skipped={} writes={} interrupted={} elapsed={}",
            summary.completed,
            summary.failed,
            summary.skipped,
            summary.writes,
            summary.interrupted,
            fmt_duration(summary.elapsed)
        ));
        Ok(summary)
    }

    /// Returns the number of writes made to the section's document.
    fn run_section(&mut self, section: &Section, reporter: &mut ProgressReporter) -> Result<usize> {
        let tasks = self.space.tasks_for(section);
        let mut doc = self.store.load(section.number)?;

        if self.options.require_lower_layers {
            let missing = first_missing_lower_layer(&doc, section, self.space.layers());
            if let Some((sub, layer)) = missing {
                log::warn!(
                    "section {}: verse {sub} has no usable layer {layer}, skipping section",
                    section.number
                );
                for task in &tasks {
                    reporter.record(TaskOutcome::Skipped, Duration::ZERO);
                    self.run_log.unit(
                        TaskOutcome::Skipped,
                        task.section,
                        task.sub_unit,
                        &task.key.to_string(),
                        Duration::ZERO,
                        Some("lower layers incomplete"),
                    );
                }
                return Ok(0);
            }
        }

        if self.options.retry_failed {
            let cleared = tasks
                .iter()
                .filter(|t| doc.remove_failure(t.sub_unit, &t.key))
                .count();
            if cleared > 0 {
                log::info!("section {}: retrying {cleared} failed unit(s)", section.number);
            }
        }

        let pb = match self.progress {
            Some(p) => {
                p.section_bar(&format!("{} {}", section.number, section.name), tasks.len() as u64)
            }
            None => ProgressBar::hidden(),
        };
        let before = (reporter.completed(), reporter.failed(), reporter.skipped());
        let mut writes = 0;

        for task in &tasks {
            if self.stop_requested() {
                log::warn!("shutdown requested, stopping in section {}", section.number);
                break;
            }
            let started = Instant::now();
            let (outcome, detail) = self.run_task(task, section, &mut doc, &pb);
            let elapsed = started.elapsed();

            if outcome != TaskOutcome::Skipped {
                self.store.save(section.number, &doc)?;
                writes += 1;
            }
            reporter.record(outcome, elapsed);
            self.run_log.unit(
                outcome,
                task.section,
                task.sub_unit,
                &task.key.to_string(),
                elapsed,
                detail.as_deref(),
            );
            log::debug!("{task}: {outcome:?} in {}", fmt_duration(elapsed));
            pb.inc(1);
            pb.set_message(reporter.status_line());
        }
        pb.finish_and_clear();

        log::info!(
            "section {} ({}): ok={} failed={} skipped={} | {}",
            section.number,
            section.name,
            reporter.completed() - before.0,
            reporter.failed() - before.1,
            reporter.skipped() - before.2,
            reporter.status_line()
        );
        Ok(writes)
    }

    /// Decide and execute one task, mutating `doc` on anything but a skip.
    fn run_task(
        &self,
        task: &GenerationTask,
        section: &Section,
        doc: &mut Document,
        pb: &ProgressBar,
    ) -> (TaskOutcome, Option<String>) {
        if doc.has_key(task.sub_unit, &task.key) {
            return (TaskOutcome::Skipped, None);
        }

        let label = task.to_string();
        let result = match self.space.variant() {
            Some(variant) => {
                let source = doc
                    .get(task.sub_unit, &task.key.source())
                    .filter(|s| !s.trim().is_empty() && !is_failure_sentinel(s))
                    .map(str::to_owned);
                let Some(source) = source else {
                    return (TaskOutcome::Skipped, Some("no source text".into()));
                };
                self.translate(&label, pb, &source, variant)
            }
            None => match section.sub_unit(task.sub_unit) {
                Some(unit) => {
                    let ctx = PromptContext::new(task.layer(), section, unit);
                    self.generate(&label, pb, &ctx)
                }
                None => Err(ProviderError::Invalid(format!(
                    "verse {} not in corpus",
                    task.sub_unit
                ))),
            },
        };

        match result {
            Ok(text) => {
                doc.put(task.sub_unit, &task.key, text);
                (TaskOutcome::Completed, None)
            }
            Err(err) => {
                log::error!("{label}: {err}");
                let sentinel = match task.key.suffix {
                    Some(_) => translation_sentinel(&err),
                    None => generation_sentinel(task.layer(), task.sub_unit, &err),
                };
                doc.put(task.sub_unit, &task.key, sentinel);
                (TaskOutcome::Failed, Some(format!("{}: {err}", err.class())))
            }
        }
    }

    fn generate(
        &self,
        label: &str,
        pb: &ProgressBar,
        ctx: &PromptContext,
    ) -> Result<String, ProviderError> {
        self.retry.run(label, pb, || {
            let raw = self.provider.generate(ctx)?;
            let text = self.post.process(&raw);
            if text.is_empty() {
                return Err(ProviderError::Transient("nothing left after cleanup".into()));
            }
            Ok(text)
        })
    }

    fn translate(
        &self,
        label: &str,
        pb: &ProgressBar,
        source: &str,
        variant: &Variant,
    ) -> Result<String, ProviderError> {
        // banners only; truncation repair is tuned for English
        self.retry.run(label, pb, || {
            let raw = self.provider.translate(source, variant)?;
            let text = self.post.strip_prefixes(&raw);
            if text.is_empty() {
                return Err(ProviderError::Transient("nothing left after cleanup".into()));
            }
            Ok(text)
        })
    }
}

/// First `(sub_unit, layer)` below the run's lowest layer that lacks real
/// content, or `None` when every corpus sub-unit is ready.
fn first_missing_lower_layer(
    doc: &Document,
    section: &Section,
    layers: &[u8],
) -> Option<(u32, u8)> {
    let lowest = layers.iter().copied().min()?;
    section.sub_units.iter().find_map(|unit| {
        (1..lowest)
            .find(|&l| {
                !doc
                    .get(unit.number, &LayerKey::base(l))
                    .is_some_and(|v| !v.trim().is_empty() && !is_failure_sentinel(v))
            })
            .map(|l| (unit.number, l))
    })
}
