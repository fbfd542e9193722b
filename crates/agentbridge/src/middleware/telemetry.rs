use std::sync::Arc;

use crate::events::{Event, EventEmitter};
use crate::middleware::{Context, Middleware, Next};
use crate::ir::{BridgeError, IRChatResponse};

/// Timing + event sink, independent of `logging`'s human-readable output.
/// Emits on the same `EventEmitter` the Bridge uses for its own
/// `request:*` events, so a single subscriber can observe both without
/// scraping log lines.
pub struct TelemetryMiddleware {
	emitter: Arc<EventEmitter>,
}

impl TelemetryMiddleware {
	pub fn new(emitter: Arc<EventEmitter>) -> Self {
		Self { emitter }
	}
}

#[async_trait::async_trait]
impl Middleware for TelemetryMiddleware {
	fn name(&self) -> &str {
		"telemetry"
	}

	async fn handle(&self, ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError> {
		let request_id = ctx.request.metadata.request_id.clone();
		let start = ctx.start_time;
		let result = next.call(ctx).await;
		match &result {
			Ok(_) => self.emitter.emit(Event::RequestSuccess { request_id, duration_ms: start.elapsed().as_millis() as u64 }),
			Err(err) => self.emitter.emit(Event::RequestError { request_id, code: err.code().to_string(), duration_ms: start.elapsed().as_millis() as u64 }),
		}
		result
	}
}
