//! Tafsir Core - shared infrastructure for the commentary pipeline
//!
//! Classified provider failures, retry/backoff, the blocking HTTP bridge,
//! progress and logging plumbing, run logs and graceful shutdown.

pub mod error;
pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod runlog;
pub mod shutdown;

// Re-exports for convenience
pub use error::ProviderError;
pub use http::{SHARED_RUNTIME, get_json, http_client, parse_retry_after, post_json};
pub use logging::{IndicatifLogger, init_logging};
pub use progress::{
    ProgressContext, ProgressReporter, SharedProgress, TaskOutcome, fmt_bytes, fmt_duration,
    fmt_num,
};
pub use retry::RetryPolicy;
pub use runlog::{RunLog, TIMESTAMP_FORMAT, timestamped_name};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown, shutdown_flag};
