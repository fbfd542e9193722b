use super::{Context, Middleware, Next};
use crate::ir::{BridgeError, IRChatResponse, IRContentBlock};

/// Structural IR validation: non-empty message list, non-empty content,
/// well-formed content blocks (a `tool_use` block's `input` must be a JSON
/// object, never a raw string — §3's IRContentBlock invariant). Runs before
/// any network I/O, so a malformed request fails fast as a non-retryable
/// `Validation` error rather than burning a backend round trip.
pub struct ValidationMiddleware;

#[async_trait::async_trait]
impl Middleware for ValidationMiddleware {
	fn name(&self) -> &str {
		"validation"
	}

	async fn handle(&self, ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError> {
		if ctx.request.messages.is_empty() {
			return Err(BridgeError::Validation { message: "request must contain at least one message".to_string(), field: Some("messages".to_string()) });
		}
		for (i, message) in ctx.request.messages.iter().enumerate() {
			if message.content.is_empty() {
				return Err(BridgeError::Validation { message: format!("message {i} has empty content"), field: Some(format!("messages[{i}].content")) });
			}
			if let crate::ir::IRContent::Blocks(blocks) = &message.content {
				for (j, block) in blocks.iter().enumerate() {
					if let IRContentBlock::ToolUse { input, .. } = block {
						if !input.is_object() {
							return Err(BridgeError::Validation {
								message: format!("message {i} block {j}: tool_use input must be a JSON object"),
								field: Some(format!("messages[{i}].content[{j}].input")),
							});
						}
					}
				}
			}
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

	#[tokio::test]
	async fn rejects_empty_message_list() {
		let mut stack = MiddlewareStack::new();
		stack.use_middleware(Arc::new(ValidationMiddleware));
		let req = IRChatRequest::new(vec![], IRMetadata::new(agentbridge_core::ids::request_id()));
		let err = stack.run(Context::new(req), backend()).await.unwrap_err();
		assert!(matches!(err, BridgeError::Validation { .. }));
	}

	#[tokio::test]
	async fn accepts_well_formed_request() {
		let mut stack = MiddlewareStack::new();
		stack.use_middleware(Arc::new(ValidationMiddleware));
		let req = IRChatRequest::new(vec![IRMessage::user("hi")], IRMetadata::new(agentbridge_core::ids::request_id()));
		assert!(stack.run(Context::new(req), backend()).await.is_ok());
	}
}
