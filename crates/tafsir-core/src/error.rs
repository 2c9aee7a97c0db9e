//! Classified provider failures

use std::time::Duration;

/// Failure returned by a generation or translation backend.
///
/// Backends never hand raw transport errors to the orchestrator; every fault is
/// mapped onto one of these classes first. [`RetryPolicy`](crate::RetryPolicy)
/// retries the first two and gives up immediately on the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider asked us to slow down (HTTP 429)
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },
    /// Overload, network blip, timeout, garbled response
    Transient(String),
    /// Request can never succeed as sent (bad layer, price ceiling, 4xx)
    Invalid(String),
    /// Credentials or account problem; retrying is pointless
    Fatal(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited {
                retry_after: Some(d),
                message,
            } => write!(f, "rate limited (retry after {}s): {message}", d.as_secs()),
            Self::RateLimited {
                retry_after: None,
                message,
            } => write!(f, "rate limited: {message}"),
            Self::Transient(m) => write!(f, "transient: {m}"),
            Self::Invalid(m) => write!(f, "invalid request: {m}"),
            Self::Fatal(m) => write!(f, "fatal: {m}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient(_))
    }

    /// Short machine-readable class name, used in run logs.
    pub fn class(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Transient(_) => "transient",
            Self::Invalid(_) => "invalid",
            Self::Fatal(_) => "fatal",
        }
    }

    /// Classify an HTTP status code returned by a provider.
    pub fn from_status(status: u16, retry_after: Option<Duration>, body: &str) -> Self {
        let message = format!("HTTP {status}: {}", truncate(body, 200));
        match status {
            429 => Self::RateLimited {
                retry_after,
                message,
            },
            401 | 402 | 403 => Self::Fatal(message),
            408 | 500..=599 => Self::Transient(message),
            _ => Self::Invalid(message),
        }
    }

    /// Classify a transport-level reqwest error (no usable response).
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Self::from_status(status.as_u16(), None, &e.to_string());
        }
        if e.is_builder() {
            return Self::Invalid(e.to_string());
        }
        // timeouts, connect failures, body decode: all worth another attempt
        Self::Transient(e.to_string())
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
