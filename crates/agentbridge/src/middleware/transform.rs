use super::{Context, Middleware, Next};
use crate::ir::{BridgeError, IRChatRequest, IRChatResponse};

/// Pure request/response edit hook backed by user-supplied closures. Either
/// side may be omitted; an absent hook is a no-op rather than an error.
pub struct TransformMiddleware {
	request_fn: Option<Box<dyn Fn(IRChatRequest) -> IRChatRequest + Send + Sync>>,
	response_fn: Option<Box<dyn Fn(IRChatResponse) -> IRChatResponse + Send + Sync>>,
}

impl TransformMiddleware {
	pub fn new() -> Self {
		Self { request_fn: None, response_fn: None }
	}

	pub fn on_request(mut self, f: impl Fn(IRChatRequest) -> IRChatRequest + Send + Sync + 'static) -> Self {
		self.request_fn = Some(Box::new(f));
		self
	}

	pub fn on_response(mut self, f: impl Fn(IRChatResponse) -> IRChatResponse + Send + Sync + 'static) -> Self {
		self.response_fn = Some(Box::new(f));
		self
	}
}

impl Default for TransformMiddleware {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait::async_trait]
impl Middleware for TransformMiddleware {
	fn name(&self) -> &str {
		"transform"
	}

	async fn handle(&self, mut ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError> {
		if let Some(f) = &self.request_fn {
			ctx.request = f(ctx.request);
		}
		let response = next.call(ctx).await?;
		Ok(match &self.response_fn {
			Some(f) => f(response),
			None => response,
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::ir::{FinishReason, IRMessage, IRMetadata};
	use crate::middleware::{BackendCall, MiddlewareStack};

	fn req() -> IRChatRequest {
		IRChatRequest::new(vec![IRMessage::user("hi")], IRMetadata::new(agentbridge_core::ids::request_id()))
	}

	fn echo_model() -> BackendCall {
		Arc::new(|ctx: Context| {
			Box::pin(async move {
				let model = ctx.request.model().unwrap_or_default().to_string();
				Ok(IRChatResponse { message: IRMessage::assistant(model), finish_reason: FinishReason::Stop, usage: None, metadata: ctx.request.metadata, raw: None })
			})
		})
	}

	#[tokio::test]
	async fn request_hook_runs_before_backend() {
		let mut stack = MiddlewareStack::new();
		stack.use_middleware(Arc::new(TransformMiddleware::new().on_request(|mut r| {
			r.parameters.get_or_insert_with(Default::default).model = Some("forced-model".to_string());
			r
		})));
		let resp = stack.run(Context::new(req()), echo_model()).await.unwrap();
		assert_eq!(resp.message.content.as_text(), "forced-model");
	}
}
