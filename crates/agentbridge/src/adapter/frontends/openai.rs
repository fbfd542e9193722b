use agentbridge_core::strng;
use agentbridge_core::strng::Strng;
use futures::StreamExt;

use crate::adapter::streaming_mode::StreamModeConverter;
use crate::adapter::{AdapterMetadata, Capabilities, DialectChunkStream, FromIRStreamOptions, FrontendAdapter, IRChunkStream, SystemMessageStrategy};
use crate::ir::{BridgeError, FinishReason, IRChatRequest, IRChatResponse, IRContent, IRMessage, IRMetadata, IRParameters, IRStreamChunk, Role, StreamMode, Usage};

/// OpenAI Chat Completions wire types, grounded on `llm::universal`'s
/// already-OpenAI-shaped `ChatCompletionRequest`/`Response`, trimmed to the
/// fields this bridge's IR round-trips.
pub mod types {
	use serde::{Deserialize, Serialize};
	use serde_json::Value;

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Message {
		pub role: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub content: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub name: Option<String>,
	}

	#[derive(Debug, Clone, Default, Serialize, Deserialize)]
	pub struct ChatCompletionRequest {
		pub model: String,
		pub messages: Vec<Message>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub temperature: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub top_p: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub max_tokens: Option<u64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub stop: Option<Vec<String>>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub stream: Option<bool>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub seed: Option<i64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub frequency_penalty: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub presence_penalty: Option<f64>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Choice {
		pub index: u32,
		pub message: Message,
		pub finish_reason: Option<String>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct ChatCompletionResponse {
		pub id: String,
		pub model: String,
		pub choices: Vec<Choice>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub usage: Option<UsageWire>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct UsageWire {
		pub prompt_tokens: u64,
		pub completion_tokens: u64,
		pub total_tokens: u64,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct ChoiceDelta {
		pub index: u32,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub role: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub content: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub finish_reason: Option<String>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct ChatCompletionChunk {
		pub id: String,
		pub model: String,
		pub choices: Vec<ChoiceDelta>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub usage: Option<UsageWire>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct ErrorBody {
		pub message: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub code: Option<String>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct ErrorResponse {
		pub error: ErrorBody,
	}

	#[allow(dead_code)]
	pub type Extra = Value;
}

use types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChoiceDelta, Message};

pub fn translate_request(req: IRChatRequest) -> ChatCompletionRequest {
	let params = req.parameters.unwrap_or_default();
	ChatCompletionRequest {
		model: params.model.unwrap_or_default(),
		messages: req.messages.into_iter().map(to_wire_message).collect(),
		temperature: params.temperature,
		top_p: params.top_p,
		max_tokens: params.max_tokens,
		stop: if params.stop_sequences.is_empty() { None } else { Some(params.stop_sequences) },
		stream: req.stream,
		seed: params.seed,
		frequency_penalty: params.frequency_penalty,
		presence_penalty: params.presence_penalty,
	}
}

fn to_wire_message(m: IRMessage) -> Message {
	Message { role: role_to_wire(m.role).to_string(), content: Some(m.content.as_text()), name: None }
}

fn role_to_wire(role: Role) -> &'static str {
	match role {
		Role::System => "system",
		Role::User => "user",
		Role::Assistant => "assistant",
	}
}

fn finish_reason_to_wire(reason: FinishReason) -> &'static str {
	match reason {
		FinishReason::Stop => "stop",
		FinishReason::Length => "length",
		FinishReason::ContentFilter => "content_filter",
		FinishReason::ToolCalls => "tool_calls",
	}
}

fn finish_reason_from_wire(raw: &str) -> FinishReason {
	match raw {
		"length" => FinishReason::Length,
		"content_filter" => FinishReason::ContentFilter,
		"tool_calls" | "function_call" => FinishReason::ToolCalls,
		_ => FinishReason::Stop,
	}
}

pub fn translate_response(resp: IRChatResponse) -> ChatCompletionResponse {
	let usage = resp.usage.map(|u| types::UsageWire { prompt_tokens: u.prompt_tokens, completion_tokens: u.completion_tokens, total_tokens: u.total_tokens });
	ChatCompletionResponse {
		id: resp.metadata.request_id.to_string(),
		model: String::new(),
		choices: vec![types::Choice { index: 0, message: to_wire_message(resp.message), finish_reason: Some(finish_reason_to_wire(resp.finish_reason).to_string()) }],
		usage,
	}
}

/// Reconstructs an `IRChatResponse` from a decoded response body's id, first
/// choice, and usage, for backends that receive the response already parsed
/// into these wire types (see `adapter::backends::dialect::OpenAIDialect`).
pub fn translate_response_choice_to_ir(id: String, choice: types::Choice, usage: Option<types::UsageWire>) -> IRChatResponse {
	let mut metadata = IRMetadata::new(strng::new(&id));
	metadata.provider_response_id = Some(id);
	IRChatResponse {
		message: IRMessage::new(Role::normalize(&choice.message.role), IRContent::text(choice.message.content.unwrap_or_default())),
		finish_reason: from_wire_finish_reason(choice.finish_reason.as_deref()),
		usage: from_wire_usage(usage),
		metadata,
		raw: None,
	}
}

pub fn translate_dialect_request(req: ChatCompletionRequest) -> Result<IRChatRequest, BridgeError> {
	if req.messages.is_empty() {
		return Err(BridgeError::AdapterConversion { message: "request has no messages".to_string() });
	}
	let messages = req
		.messages
		.into_iter()
		.map(|m| IRMessage::new(Role::normalize(&m.role), IRContent::text(m.content.unwrap_or_default())))
		.collect();
	let parameters = IRParameters {
		model: Some(req.model),
		temperature: req.temperature,
		top_p: req.top_p,
		max_tokens: req.max_tokens,
		stop_sequences: req.stop.unwrap_or_default(),
		seed: req.seed,
		frequency_penalty: req.frequency_penalty,
		presence_penalty: req.presence_penalty,
		..Default::default()
	};
	let request_id = agentbridge_core::ids::request_id();
	let mut metadata = IRMetadata::new(request_id);
	metadata.provenance.frontend = Some(strng::literal!("openai"));
	let mut ir = IRChatRequest::new(messages, metadata);
	ir.parameters = Some(parameters);
	ir.stream = req.stream;
	Ok(ir)
}

pub struct OpenAIFrontend {
	metadata: AdapterMetadata,
}

impl Default for OpenAIFrontend {
	fn default() -> Self {
		Self {
			metadata: AdapterMetadata {
				name: strng::literal!("openai"),
				version: strng::literal!("1"),
				provider: strng::literal!("openai"),
				capabilities: Capabilities { tools: true, multi_modal: true, system_message_strategy: SystemMessageStrategy::InMessages, ..Default::default() },
				config: serde_json::Value::Null,
			},
		}
	}
}

impl FrontendAdapter<ChatCompletionRequest, ChatCompletionResponse, ChatCompletionChunk> for OpenAIFrontend {
	fn metadata(&self) -> &AdapterMetadata {
		&self.metadata
	}

	fn to_ir(&self, request: ChatCompletionRequest) -> Result<IRChatRequest, BridgeError> {
		translate_dialect_request(request)
	}

	fn from_ir(&self, response: IRChatResponse) -> ChatCompletionResponse {
		translate_response(response)
	}

	fn from_ir_stream(&self, stream: IRChunkStream, options: FromIRStreamOptions) -> DialectChunkStream<ChatCompletionChunk> {
		let target_mode = options.stream_mode.unwrap_or(StreamMode::Delta);
		let mut converter = StreamModeConverter::new(StreamMode::Delta, target_mode);
		let id = agentbridge_core::ids::request_id().to_string();
		Box::pin(stream.filter_map(move |chunk| {
			let chunk = converter.convert(chunk);
			let id = id.clone();
			async move {
				match chunk {
					IRStreamChunk::Content { delta, role, accumulated, .. } => Some(ChatCompletionChunk {
						id,
						model: String::new(),
						choices: vec![ChoiceDelta { index: 0, role: Some(role_to_wire(role).to_string()), content: Some(accumulated.unwrap_or(delta)), finish_reason: None }],
						usage: None,
					}),
					IRStreamChunk::Done { finish_reason, usage, .. } => Some(ChatCompletionChunk {
						id,
						model: String::new(),
						choices: vec![ChoiceDelta { index: 0, role: None, content: None, finish_reason: Some(finish_reason_to_wire(finish_reason).to_string()) }],
						usage: usage.map(|u| types::UsageWire { prompt_tokens: u.prompt_tokens, completion_tokens: u.completion_tokens, total_tokens: u.total_tokens }),
					}),
					_ => None,
				}
			}
		}))
	}
}

pub fn from_wire_usage(u: Option<types::UsageWire>) -> Option<Usage> {
	u.map(|u| Usage { prompt_tokens: u.prompt_tokens, completion_tokens: u.completion_tokens, total_tokens: u.total_tokens })
}

pub fn from_wire_finish_reason(raw: Option<&str>) -> FinishReason {
	raw.map(finish_reason_from_wire).unwrap_or(FinishReason::Stop)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn to_ir_normalizes_roles_and_params() {
		let req = ChatCompletionRequest {
			model: "gpt-4o".to_string(),
			messages: vec![Message { role: "user".to_string(), content: Some("hi".to_string()), name: None }],
			temperature: Some(0.5),
			..Default::default()
		};
		let ir = translate_dialect_request(req).unwrap();
		assert_eq!(ir.messages.len(), 1);
		assert_eq!(ir.messages[0].role, Role::User);
		assert_eq!(ir.parameters.unwrap().model.as_deref(), Some("gpt-4o"));
	}

	#[test]
	fn to_ir_rejects_empty_messages() {
		let req = ChatCompletionRequest { model: "gpt-4o".to_string(), messages: vec![], ..Default::default() };
		assert!(translate_dialect_request(req).is_err());
	}

	#[test]
	fn from_ir_round_trips_text_response() {
		let metadata = IRMetadata::new(agentbridge_core::ids::request_id());
		let resp = IRChatResponse { message: IRMessage::assistant("hello"), finish_reason: FinishReason::Stop, usage: None, metadata, raw: None };
		let wire = translate_response(resp);
		assert_eq!(wire.choices[0].message.content.as_deref(), Some("hello"));
		assert_eq!(wire.choices[0].finish_reason.as_deref(), Some("stop"));
	}
}
