//! Shared plumbing for the outbound HTTP clients.

use anyhow::{Context, Result};
use std::time::Duration;

use crate::error::CompanionError;

pub(crate) fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build HTTP client")
}

/// Map a non-2xx response to [`CompanionError`]: 429 becomes `RateLimited`,
/// everything else `Upstream` carrying the response body.
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.as_u16() == 429 {
        return Err(CompanionError::RateLimited {
            provider: provider.to_string(),
        }
        .into());
    }
    let body = response.text().await.unwrap_or_default();
    Err(CompanionError::Upstream {
        provider: provider.to_string(),
        status: status.as_u16(),
        body,
    }
    .into())
}

/// Send a request, mapping transport timeouts to [`CompanionError::Timeout`].
pub(crate) async fn send(provider: &str, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = request.send().await.map_err(|e| -> anyhow::Error {
        if e.is_timeout() {
            CompanionError::Timeout(format!("{provider} request timed out")).into()
        } else {
            anyhow::Error::new(e).context(format!("{provider} request failed"))
        }
    })?;
    ensure_success(provider, response).await
}
