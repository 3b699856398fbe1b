//! Exponential backoff for rate-limited model calls.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use super::{ChatModel, ToolRequest};
use crate::config::ChatConfig;
use crate::error::is_rate_limited;

/// Wraps a [`ChatModel`] and retries rate-limited calls, waiting
/// `base_delay * 2^attempt` between attempts. Other errors return at once.
pub struct Retrying<M> {
    inner: M,
    max_attempts: u32,
    base_delay: Duration,
}

impl<M: ChatModel> Retrying<M> {
    pub fn new(inner: M, config: &ChatConfig) -> Self {
        Self::with_policy(
            inner,
            config.max_retries,
            Duration::from_millis(config.retry_base_delay_ms),
        )
    }

    pub fn with_policy(inner: M, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }
}

/// `base * 2^attempt`, saturating instead of overflowing.
fn backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.checked_pow(attempt).unwrap_or(u32::MAX))
}

#[async_trait]
impl<M: ChatModel> ChatModel for Retrying<M> {
    fn provider(&self) -> &str {
        self.inner.provider()
    }

    async fn call_tool(&self, request: &ToolRequest) -> Result<Value> {
        let mut attempt = 0;
        loop {
            match self.inner.call_tool(request).await {
                Err(e) if is_rate_limited(&e) && attempt + 1 < self.max_attempts => {
                    let delay = backoff(self.base_delay, attempt);
                    tracing::warn!(
                        provider = self.inner.provider(),
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
