use agentbridge_core::strng;
use futures::StreamExt;

use crate::adapter::streaming_mode::StreamModeConverter;
use crate::adapter::{AdapterMetadata, Capabilities, DialectChunkStream, FromIRStreamOptions, FrontendAdapter, IRChunkStream, SystemMessageStrategy};
use crate::ir::{BridgeError, FinishReason, IRChatRequest, IRChatResponse, IRContent, IRMessage, IRMetadata, IRParameters, IRStreamChunk, Role, StreamMode};

/// Anthropic Messages wire types, grounded on `llm::anthropic::types`: a
/// top-level `system` field separate from `messages`, and a `stop_reason`
/// vocabulary distinct from OpenAI's `finish_reason`.
pub mod types {
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Message {
		pub role: String,
		pub content: String,
	}

	#[derive(Debug, Clone, Default, Serialize, Deserialize)]
	pub struct MessagesRequest {
		pub model: String,
		pub messages: Vec<Message>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub system: Option<String>,
		pub max_tokens: u64,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub temperature: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub top_p: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub top_k: Option<u64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub stop_sequences: Option<Vec<String>>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub stream: Option<bool>,
	}

	#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
	#[serde(rename_all = "snake_case")]
	pub enum StopReason {
		EndTurn,
		MaxTokens,
		StopSequence,
		ToolUse,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Usage {
		pub input_tokens: u64,
		pub output_tokens: u64,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct ContentBlock {
		#[serde(rename = "type")]
		pub block_type: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub text: Option<String>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct MessagesResponse {
		pub id: String,
		pub model: String,
		pub content: Vec<ContentBlock>,
		pub stop_reason: Option<StopReason>,
		pub usage: Usage,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	#[serde(tag = "type", rename_all = "snake_case")]
	pub enum MessagesStreamEvent {
		MessageStart { message: MessageStartPayload },
		ContentBlockDelta { delta: ContentBlockDelta },
		MessageDelta { delta: MessageDeltaPayload, usage: Usage },
		MessageStop,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct MessageStartPayload {
		pub id: String,
		pub model: String,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	#[serde(tag = "type", rename_all = "snake_case")]
	pub enum ContentBlockDelta {
		TextDelta { text: String },
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct MessageDeltaPayload {
		pub stop_reason: Option<StopReason>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct MessagesErrorResponse {
		pub error: ErrorBody,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct ErrorBody {
		#[serde(rename = "type")]
		pub error_type: String,
		pub message: String,
	}
}

use types::{Message, MessagesRequest, MessagesResponse, MessagesStreamEvent, StopReason};

use crate::adapter::system_message::normalize_system_messages;

pub fn translate_request(req: IRChatRequest) -> MessagesRequest {
	let params = req.parameters.unwrap_or_default();
	let (messages, system) = normalize_system_messages(req.messages, SystemMessageStrategy::SeparateParameter, false);
	MessagesRequest {
		model: params.model.unwrap_or_default(),
		messages: messages.into_iter().map(|m| Message { role: role_to_wire(m.role).to_string(), content: m.content.as_text() }).collect(),
		system: system.map(|entries| entries.join("\n")),
		max_tokens: params.max_tokens.unwrap_or(4096),
		temperature: params.temperature,
		top_p: params.top_p,
		top_k: params.top_k,
		stop_sequences: if params.stop_sequences.is_empty() { None } else { Some(params.stop_sequences) },
		stream: req.stream,
	}
}

fn role_to_wire(role: Role) -> &'static str {
	match role {
		Role::Assistant => "assistant",
		// Anthropic has no "system" message role in `messages`; system content is
		// extracted to the sidecar field by `normalize_system_messages` before
		// this is ever reached.
		Role::System | Role::User => "user",
	}
}

pub fn stop_reason_to_finish(reason: Option<StopReason>) -> FinishReason {
	match reason {
		Some(StopReason::MaxTokens) => FinishReason::Length,
		Some(StopReason::ToolUse) => FinishReason::ToolCalls,
		_ => FinishReason::Stop,
	}
}

pub fn translate_response(resp: MessagesResponse) -> IRChatResponse {
	let text = resp.content.into_iter().filter_map(|b| b.text).collect::<Vec<_>>().join("");
	let mut metadata = IRMetadata::new(agentbridge_core::ids::request_id());
	metadata.provider_response_id = Some(resp.id);
	metadata.provenance.backend = Some(strng::literal!("anthropic"));
	IRChatResponse {
		message: IRMessage::assistant(text),
		finish_reason: stop_reason_to_finish(resp.stop_reason),
		usage: Some(crate::ir::Usage::new(resp.usage.input_tokens, resp.usage.output_tokens)),
		metadata,
		raw: None,
	}
}

pub fn translate_dialect_request(req: MessagesRequest) -> Result<IRChatRequest, BridgeError> {
	if req.messages.is_empty() {
		return Err(BridgeError::AdapterConversion { message: "request has no messages".to_string() });
	}
	let mut messages: Vec<IRMessage> = Vec::new();
	if let Some(system) = &req.system {
		messages.push(IRMessage::system(system.clone()));
	}
	messages.extend(req.messages.into_iter().map(|m| IRMessage::new(Role::normalize(&m.role), IRContent::text(m.content))));
	let parameters = IRParameters {
		model: Some(req.model),
		temperature: req.temperature,
		top_p: req.top_p,
		top_k: req.top_k,
		max_tokens: Some(req.max_tokens),
		stop_sequences: req.stop_sequences.unwrap_or_default(),
		..Default::default()
	};
	let mut metadata = IRMetadata::new(agentbridge_core::ids::request_id());
	metadata.provenance.frontend = Some(strng::literal!("anthropic"));
	let mut ir = IRChatRequest::new(messages, metadata);
	ir.parameters = Some(parameters);
	ir.stream = req.stream;
	Ok(ir)
}

pub struct AnthropicFrontend {
	metadata: AdapterMetadata,
}

impl Default for AnthropicFrontend {
	fn default() -> Self {
		Self {
			metadata: AdapterMetadata {
				name: strng::literal!("anthropic"),
				version: strng::literal!("1"),
				provider: strng::literal!("anthropic"),
				capabilities: Capabilities {
					tools: true,
					multi_modal: true,
					system_message_strategy: SystemMessageStrategy::SeparateParameter,
					supports_multiple_system_messages: false,
					supports_top_k: true,
					..Default::default()
				},
				config: serde_json::Value::Null,
			},
		}
	}
}

impl FrontendAdapter<MessagesRequest, MessagesResponse, MessagesStreamEvent> for AnthropicFrontend {
	fn metadata(&self) -> &AdapterMetadata {
		&self.metadata
	}

	fn to_ir(&self, request: MessagesRequest) -> Result<IRChatRequest, BridgeError> {
		translate_dialect_request(request)
	}

	fn from_ir(&self, response: IRChatResponse) -> MessagesResponse {
		// Denormalization is total: synthesize an id from the IR request id
		// when no provider id was recorded (e.g. a mocked response in tests).
		let id = response.metadata.provider_response_id.clone().unwrap_or_else(|| response.metadata.request_id.to_string());
		let usage = response.usage.unwrap_or_default();
		MessagesResponse {
			id,
			model: String::new(),
			content: vec![types::ContentBlock { block_type: "text".to_string(), text: Some(response.message.content.as_text()) }],
			stop_reason: Some(finish_to_stop_reason(response.finish_reason)),
			usage: types::Usage { input_tokens: usage.prompt_tokens, output_tokens: usage.completion_tokens },
		}
	}

	fn from_ir_stream(&self, stream: IRChunkStream, options: FromIRStreamOptions) -> DialectChunkStream<MessagesStreamEvent> {
		let target_mode = options.stream_mode.unwrap_or(StreamMode::Delta);
		let mut converter = StreamModeConverter::new(StreamMode::Delta, target_mode);
		Box::pin(stream.filter_map(move |chunk| {
			let chunk = converter.convert(chunk);
			async move {
				match chunk {
					IRStreamChunk::Start { metadata } => Some(MessagesStreamEvent::MessageStart {
						message: types::MessageStartPayload { id: metadata.request_id.to_string(), model: String::new() },
					}),
					IRStreamChunk::Content { delta, accumulated, .. } => {
						Some(MessagesStreamEvent::ContentBlockDelta { delta: types::ContentBlockDelta::TextDelta { text: accumulated.unwrap_or(delta) } })
					},
					IRStreamChunk::Done { finish_reason, usage, .. } => Some(MessagesStreamEvent::MessageDelta {
						delta: types::MessageDeltaPayload { stop_reason: Some(finish_to_stop_reason(finish_reason)) },
						usage: types::Usage { input_tokens: usage.map(|u| u.prompt_tokens).unwrap_or_default(), output_tokens: usage.map(|u| u.completion_tokens).unwrap_or_default() },
					}),
					_ => None,
				}
			}
		}))
	}
}

fn finish_to_stop_reason(reason: FinishReason) -> StopReason {
	match reason {
		FinishReason::Length => StopReason::MaxTokens,
		FinishReason::ToolCalls => StopReason::ToolUse,
		FinishReason::Stop | FinishReason::ContentFilter => StopReason::EndTurn,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn to_ir_extracts_system_into_leading_message() {
		let req = MessagesRequest {
			model: "claude-3-5-sonnet".to_string(),
			messages: vec![Message { role: "user".to_string(), content: "hi".to_string() }],
			system: Some("be terse".to_string()),
			max_tokens: 1024,
			..Default::default()
		};
		let ir = translate_dialect_request(req).unwrap();
		assert_eq!(ir.messages.len(), 2);
		assert_eq!(ir.messages[0].role, Role::System);
		assert_eq!(ir.messages[1].role, Role::User);
	}

	#[test]
	fn request_translation_merges_system_messages_into_sidecar() {
		let ir_messages = vec![IRMessage::system("a"), IRMessage::system("b"), IRMessage::user("hi")];
		let mut metadata = IRMetadata::new(agentbridge_core::ids::request_id());
		metadata.provenance.frontend = Some(strng::literal!("anthropic"));
		let mut ir = IRChatRequest::new(ir_messages, metadata);
		ir.parameters = Some(IRParameters { model: Some("claude-3-5-sonnet".to_string()), ..Default::default() });
		let wire = translate_request(ir);
		assert_eq!(wire.system.as_deref(), Some("a\nb"));
		assert_eq!(wire.messages.len(), 1);
	}
}
