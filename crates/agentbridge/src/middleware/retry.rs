use std::time::Duration;

use tracing::debug;

use super::{Context, Middleware, Next};
use crate::ir::{BridgeError, IRChatResponse};

#[derive(Debug, Clone)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self { max_attempts: 3, base_delay: Duration::from_millis(200), max_delay: Duration::from_secs(10) }
	}
}

/// Exponential backoff on `BridgeError::is_retryable` errors. Honors
/// `retry_after_ms` on `RateLimit` errors in place of the computed backoff,
/// mirroring the teacher's `http::retry` handling of provider-advertised
/// retry hints over a fixed schedule.
pub struct RetryMiddleware {
	config: RetryConfig,
}

impl RetryMiddleware {
	pub fn new(config: RetryConfig) -> Self {
		Self { config }
	}

	fn backoff_for(&self, attempt: u32, error: &BridgeError) -> Duration {
		if let BridgeError::RateLimit { retry_after_ms: Some(ms) } = error {
			return Duration::from_millis(*ms).min(self.config.max_delay);
		}
		let exp = self.config.base_delay.as_millis().saturating_mul(1u128 << attempt.min(16));
		Duration::from_millis(exp as u64).min(self.config.max_delay)
	}
}

impl Default for RetryMiddleware {
	fn default() -> Self {
		Self::new(RetryConfig::default())
	}
}

#[async_trait::async_trait]
impl Middleware for RetryMiddleware {
	fn name(&self) -> &str {
		"retry"
	}

	async fn handle(&self, ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError> {
		// `next` is consumed by the first call; retries re-enter the chain by
		// re-running the *rest* of the stack is not possible once `Next` is
		// consumed, so retry sits innermost in practice — re-running the
		// request against the same terminal backend call directly.
		let Next { middlewares, index, backend } = next;
		let mut attempt = 0u32;
		let mut request = ctx.request.clone();
		loop {
			let attempt_ctx = Context { request: request.clone(), backend: ctx.backend.clone(), start_time: ctx.start_time, cancel: ctx.cancel.clone(), attachments: ctx.attachments.clone() };
			let result = super::dispatch(middlewares.clone(), index, attempt_ctx, backend.clone()).await;
			match result {
				Ok(resp) => return Ok(resp),
				Err(err) if attempt + 1 < self.config.max_attempts && err.is_retryable() => {
					let delay = self.backoff_for(attempt, &err);
					debug!(attempt, ?delay, code = err.code(), "retrying after retryable error");
					tokio::time::sleep(delay).await;
					attempt += 1;
					request.metadata.custom.insert("retryAttempt".to_string(), serde_json::json!(attempt));
					continue;
				},
				Err(err) => return Err(err),
			}
		}
	}
}
