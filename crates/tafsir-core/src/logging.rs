//! Log lines that coexist with progress bars

use std::fmt;

use indicatif::MultiProgress;
use log::Level;

const RESET: &str = "\x1b[0m";

/// Fixed-width level tag so messages line up.
fn tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN ",
        Level::Info => "INFO ",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

fn ansi(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m",
        Level::Warn => "\x1b[33m",
        Level::Info => "\x1b[32m",
        Level::Debug => "\x1b[36m",
        Level::Trace => "\x1b[35m",
    }
}

/// `[LEVEL] message`, with the tag colored on a terminal.
fn render(level: Level, args: &fmt::Arguments<'_>, color: bool) -> String {
    if color {
        format!("[{}{}{RESET}] {args}", ansi(level), tag(level))
    } else {
        format!("[{}] {args}", tag(level))
    }
}

/// Routes records through [`MultiProgress::suspend`] so bars are redrawn
/// below each line instead of being torn by it.
pub struct IndicatifLogger {
    filter: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    /// `filter` decides which records pass; its own formatting is unused.
    pub fn new(filter: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { filter, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.filter.matches(record) {
            return;
        }
        let line = render(record.level(), record.args(), true);
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {}
}

/// Install the global logger.
///
/// With `multi` set, lines go through [`IndicatifLogger`]; otherwise plain
/// `[LEVEL] message` lines without color. `RUST_LOG` always wins.
/// A second call is a no-op.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let level = match (debug, quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    let mut builder = env_logger::Builder::from_env(env);

    match multi {
        Some(multi) => {
            let filter = builder.build();
            let max_level = filter.filter();
            let logger = IndicatifLogger::new(filter, multi.clone());
            if log::set_boxed_logger(Box::new(logger)).is_ok() {
                log::set_max_level(max_level);
            }
        }
        None => {
            let _ = builder
                .format(|buf, record| {
                    writeln!(buf, "{}", render(record.level(), record.args(), false))
                })
                .try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_have_padded_tags() {
        assert_eq!(render(Level::Warn, &format_args!("slow down"), false), "[WARN ] slow down");
        assert_eq!(tag(Level::Error).len(), tag(Level::Info).len());
    }

    #[test]
    fn colored_lines_reset_after_tag() {
        let line = render(Level::Info, &format_args!("saved"), true);
        assert!(line.starts_with("[\x1b[32mINFO "));
        assert!(line.ends_with("\x1b[0m] saved"));
    }
}
