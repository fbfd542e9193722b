use tracing::{error, info, info_span, Instrument};

use super::{Context, Middleware, Next};
use crate::ir::{BridgeError, IRChatResponse};

/// Structured `tracing` events at request start/success/error. Grounded on
/// the teacher's `telemetry::log` module's habit of wrapping the proxied
/// call in a span carrying the request id and emitting one event per
/// outcome, without the CEL-driven field selection the teacher layers on
/// top (out of scope here — see SPEC_FULL.md §6.1).
pub struct LoggingMiddleware;

#[async_trait::async_trait]
impl Middleware for LoggingMiddleware {
	fn name(&self) -> &str {
		"logging"
	}

	async fn handle(&self, ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError> {
		let request_id = ctx.request.metadata.request_id.clone();
		let backend = ctx.backend.clone();
		let span = info_span!("request", request_id = %request_id, backend = tracing::field::Empty);
		if let Some(backend) = &backend {
			span.record("backend", tracing::field::display(backend));
		}

		async move {
			let start = ctx.start_time;
			info!("request started");
			match next.call(ctx).await {
				Ok(resp) => {
					info!(duration_ms = start.elapsed().as_millis() as u64, finish_reason = ?resp.finish_reason, "request succeeded");
					Ok(resp)
				},
				Err(err) => {
					error!(duration_ms = start.elapsed().as_millis() as u64, code = err.code(), retryable = err.is_retryable(), "request failed");
					Err(err)
				},
			}
		}
		.instrument(span)
		.await
	}
}
