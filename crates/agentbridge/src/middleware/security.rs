use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;

use crate::ir::{BridgeError, IRChatResponse};
use crate::middleware::{Context, Middleware, Next};

struct Bucket {
	tokens: f64,
	last_refill: Instant,
}

/// Token-bucket rate limiter keyed by a caller-supplied identity extractor
/// (e.g. an API key or tenant id read out of `request.metadata.custom`).
/// One bucket per identity, refilled continuously at `refill_per_sec`.
pub struct RateLimitMiddleware {
	capacity: f64,
	refill_per_sec: f64,
	buckets: Mutex<HashMap<String, Bucket>>,
	identity_fn: Box<dyn Fn(&Context) -> String + Send + Sync>,
}

impl RateLimitMiddleware {
	pub fn new(capacity: f64, refill_per_sec: f64, identity_fn: impl Fn(&Context) -> String + Send + Sync + 'static) -> Self {
		Self { capacity, refill_per_sec, buckets: Mutex::new(HashMap::new()), identity_fn: Box::new(identity_fn) }
	}

	fn try_acquire(&self, identity: &str) -> bool {
		let mut buckets = self.buckets.lock();
		let now = Instant::now();
		let bucket = buckets.entry(identity.to_string()).or_insert_with(|| Bucket { tokens: self.capacity, last_refill: now });
		let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
		bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
		bucket.last_refill = now;
		if bucket.tokens >= 1.0 {
			bucket.tokens -= 1.0;
			true
		} else {
			false
		}
	}
}

#[async_trait::async_trait]
impl Middleware for RateLimitMiddleware {
	fn name(&self) -> &str {
		"security:rate-limit"
	}

	async fn handle(&self, ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError> {
		let identity = (self.identity_fn)(&ctx);
		if !self.try_acquire(&identity) {
			return Err(BridgeError::RateLimit { retry_after_ms: Some((1000.0 / self.refill_per_sec) as u64) });
		}
		next.call(ctx).await
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::ir::{FinishReason, IRChatRequest, IRMessage, IRMetadata};
	use crate::middleware::{BackendCall, MiddlewareStack};

	fn backend() -> BackendCall {
		Arc::new(|ctx: Context| Box::pin(async move { Ok(IRChatResponse { message: IRMessage::assistant("ok"), finish_reason: FinishReason::Stop, usage: None, metadata: ctx.request.metadata, raw: None }) }))
	}

	fn req() -> IRChatRequest {
		IRChatRequest::new(vec![IRMessage::user("hi")], IRMetadata::new(agentbridge_core::ids::request_id()))
	}

	#[tokio::test]
	async fn exhausts_bucket_then_rejects() {
		let mut stack = MiddlewareStack::new();
		stack.use_middleware(Arc::new(RateLimitMiddleware::new(1.0, 0.001, |_| "tenant-a".to_string())));
		assert!(stack.run(Context::new(req()), backend()).await.is_ok());
		let err = stack.run(Context::new(req()), backend()).await.unwrap_err();
		assert!(matches!(err, BridgeError::RateLimit { .. }));
	}
}
