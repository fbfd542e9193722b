use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::adapter::BackendAdapter;
use crate::ir::{BridgeError, IRChatResponse};
use crate::middleware::{Context, Middleware, Next};

/// Accumulates an estimated-cost counter from `BackendAdapter::estimate_cost`,
/// computed before dispatch (so it reflects the request actually sent, not
/// the response). Stored as cost-in-microdollars in an `AtomicU64` to avoid
/// float atomics; `total_cost()` divides back down for reporting.
pub struct CostTrackingMiddleware {
	backend: Arc<dyn BackendAdapter>,
	total_micros: AtomicU64,
}

impl CostTrackingMiddleware {
	pub fn new(backend: Arc<dyn BackendAdapter>) -> Self {
		Self { backend, total_micros: AtomicU64::new(0) }
	}

	pub fn total_cost(&self) -> f64 {
		self.total_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
	}
}

#[async_trait::async_trait]
impl Middleware for CostTrackingMiddleware {
	fn name(&self) -> &str {
		"cost-tracking"
	}

	async fn handle(&self, mut ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError> {
		if let Some(cost) = self.backend.estimate_cost(&ctx.request) {
			let micros = (cost * 1_000_000.0).round() as u64;
			self.total_micros.fetch_add(micros, Ordering::Relaxed);
			ctx.request.metadata.custom.insert("estimatedCost".to_string(), serde_json::json!(cost));
		}
		next.call(ctx).await
	}
}
