//! Blocking-style HTTP helpers over a shared tokio runtime.
//!
//! Provider calls are strictly sequential, so the async reqwest client is
//! driven through `block_on` and every outcome is classified into a
//! [`ProviderError`] before it leaves this module.

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::error::ProviderError;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared tokio runtime for HTTP operations and subprocess supervision.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Build a client with the given whole-request timeout.
///
/// A request that hangs past `request_timeout` surfaces as `Transient`.
pub fn http_client(request_timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(|e| ProviderError::Fatal(format!("cannot build HTTP client: {e}")))
}

/// POST a JSON body and parse a JSON response.
pub fn post_json(
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
    body: &serde_json::Value,
) -> Result<serde_json::Value, ProviderError> {
    SHARED_RUNTIME.handle().block_on(async {
        let resp = client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&e))?;
        read_json(resp).await
    })
}

/// GET with query parameters and parse a JSON response.
pub fn get_json(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<serde_json::Value, ProviderError> {
    SHARED_RUNTIME.handle().block_on(async {
        let resp = client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&e))?;
        read_json(resp).await
    })
}

async fn read_json(resp: reqwest::Response) -> Result<serde_json::Value, ProviderError> {
    let status = resp.status();
    let retry_after = parse_retry_after(resp.headers());
    let text = resp
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(&e))?;

    if !status.is_success() {
        return Err(ProviderError::from_status(
            status.as_u16(),
            retry_after,
            &text,
        ));
    }
    serde_json::from_str(&text)
        .map_err(|e| ProviderError::Transient(format!("unparseable response body: {e}")))
}

/// `Retry-After` in delta-seconds form; HTTP-date form is ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
