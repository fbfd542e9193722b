use serde_json::Value;

use crate::adapter::frontends::{anthropic, openai};
use crate::ir::{BridgeError, IRChatRequest, IRChatResponse, IRStreamChunk};

/// What [`HttpBackendAdapter`] needs to know to speak a given provider's wire
/// protocol: how to serialize an IR request, parse a non-streaming response
/// body, and turn one SSE event payload into zero or more IR stream chunks.
/// Reuses the same `translate_request`/`translate_response` free functions
/// the frontend adapters use — the wire shape on the backend side of a
/// passthrough provider is identical to its frontend shape.
pub trait BackendDialect: Send + Sync {
	fn path(&self) -> &str;
	fn to_wire_request(&self, request: IRChatRequest) -> Value;
	fn from_wire_response(&self, body: &[u8]) -> Result<IRChatResponse, BridgeError>;
	/// `None` for events carrying no IR-visible payload (e.g. a dialect's
	/// `message_start` framing event).
	fn from_wire_event(&self, sequence: u64, event_data: &str) -> Option<IRStreamChunk>;
}

pub struct OpenAIDialect;

impl BackendDialect for OpenAIDialect {
	fn path(&self) -> &str {
		"/v1/chat/completions"
	}

	fn to_wire_request(&self, request: IRChatRequest) -> Value {
		serde_json::to_value(openai::translate_request(request)).unwrap_or(Value::Null)
	}

	fn from_wire_response(&self, body: &[u8]) -> Result<IRChatResponse, BridgeError> {
		let wire: openai::types::ChatCompletionResponse = serde_json::from_slice(body).map_err(|e| BridgeError::Provider { message: format!("invalid response body: {e}"), retryable: false })?;
		let choice = wire.choices.into_iter().next().ok_or_else(|| BridgeError::Provider { message: "response has no choices".to_string(), retryable: false })?;
		let mut ir = openai::translate_response_choice_to_ir(wire.id, choice, wire.usage);
		ir.metadata.provenance.backend = Some(agentbridge_core::strng::literal!("openai"));
		Ok(ir)
	}

	fn from_wire_event(&self, sequence: u64, event_data: &str) -> Option<IRStreamChunk> {
		let chunk: openai::types::ChatCompletionChunk = serde_json::from_str(event_data).ok()?;
		let choice = chunk.choices.into_iter().next()?;
		if let Some(reason) = choice.finish_reason {
			return Some(IRStreamChunk::Done {
				finish_reason: openai::from_wire_finish_reason(Some(&reason)),
				message: None,
				usage: openai::from_wire_usage(chunk.usage),
			});
		}
		let delta = choice.content?;
		Some(IRStreamChunk::Content { sequence, delta, role: crate::ir::Role::Assistant, accumulated: None })
	}
}

pub struct AnthropicDialect;

impl BackendDialect for AnthropicDialect {
	fn path(&self) -> &str {
		"/v1/messages"
	}

	fn to_wire_request(&self, request: IRChatRequest) -> Value {
		serde_json::to_value(anthropic::translate_request(request)).unwrap_or(Value::Null)
	}

	fn from_wire_response(&self, body: &[u8]) -> Result<IRChatResponse, BridgeError> {
		let wire: anthropic::types::MessagesResponse = serde_json::from_slice(body).map_err(|e| BridgeError::Provider { message: format!("invalid response body: {e}"), retryable: false })?;
		let mut ir = anthropic::translate_response(wire);
		ir.metadata.provenance.backend = Some(agentbridge_core::strng::literal!("anthropic"));
		Ok(ir)
	}

	fn from_wire_event(&self, sequence: u64, event_data: &str) -> Option<IRStreamChunk> {
		let event: anthropic::types::MessagesStreamEvent = serde_json::from_str(event_data).ok()?;
		match event {
			anthropic::types::MessagesStreamEvent::ContentBlockDelta { delta: anthropic::types::ContentBlockDelta::TextDelta { text } } => {
				Some(IRStreamChunk::Content { sequence, delta: text, role: crate::ir::Role::Assistant, accumulated: None })
			},
			anthropic::types::MessagesStreamEvent::MessageDelta { delta, usage } => Some(IRStreamChunk::Done {
				finish_reason: anthropic::stop_reason_to_finish(delta.stop_reason),
				message: None,
				usage: Some(crate::ir::Usage::new(usage.input_tokens, usage.output_tokens)),
			}),
			_ => None,
		}
	}
}
