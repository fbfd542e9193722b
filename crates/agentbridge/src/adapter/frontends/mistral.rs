use agentbridge_core::strng;
use futures::StreamExt;

use crate::adapter::streaming_mode::StreamModeConverter;
use crate::adapter::{AdapterMetadata, Capabilities, DialectChunkStream, FromIRStreamOptions, FrontendAdapter, IRChunkStream, SystemMessageStrategy};
use crate::ir::{BridgeError, FinishReason, IRChatRequest, IRChatResponse, IRContent, IRMessage, IRMetadata, IRParameters, IRStreamChunk, Role, StreamMode};

/// Mistral `chat/completions` wire types — close enough to OpenAI's shape
/// that it shares the same message/choice skeleton, but keeps `random_seed`
/// and `safe_prompt` as its own fields rather than nesting sampling options.
pub mod types {
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Message {
		pub role: String,
		pub content: String,
	}

	#[derive(Debug, Clone, Default, Serialize, Deserialize)]
	pub struct ChatRequest {
		pub model: String,
		pub messages: Vec<Message>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub temperature: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub top_p: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub max_tokens: Option<u64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub random_seed: Option<i64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub stream: Option<bool>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Choice {
		pub index: u32,
		pub message: Message,
		pub finish_reason: Option<String>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct UsageWire {
		pub prompt_tokens: u64,
		pub completion_tokens: u64,
		pub total_tokens: u64,
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
	pub struct ChoiceDelta {
		pub index: u32,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub delta_content: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub finish_reason: Option<String>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct ChatCompletionChunk {
		pub id: String,
		pub choices: Vec<ChoiceDelta>,
	}
}

use types::{ChatCompletionChunk, ChatRequest, ChatCompletionResponse, ChoiceDelta, Message};

pub fn translate_request(req: IRChatRequest) -> ChatRequest {
	let params = req.parameters.unwrap_or_default();
	ChatRequest {
		model: params.model.unwrap_or_default(),
		messages: req.messages.into_iter().map(|m| Message { role: role_to_wire(m.role).to_string(), content: m.content.as_text() }).collect(),
		temperature: params.temperature,
		top_p: params.top_p,
		max_tokens: params.max_tokens,
		random_seed: params.seed,
		stream: req.stream,
	}
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
		FinishReason::Length => "length",
		FinishReason::ContentFilter => "model_length",
		FinishReason::ToolCalls => "tool_calls",
		FinishReason::Stop => "stop",
	}
}

fn finish_reason_from_wire(raw: &str) -> FinishReason {
	match raw {
		"length" => FinishReason::Length,
		"model_length" => FinishReason::ContentFilter,
		"tool_calls" => FinishReason::ToolCalls,
		_ => FinishReason::Stop,
	}
}

pub fn translate_response(resp: IRChatResponse) -> ChatCompletionResponse {
	let usage = resp.usage.map(|u| types::UsageWire { prompt_tokens: u.prompt_tokens, completion_tokens: u.completion_tokens, total_tokens: u.total_tokens });
	ChatCompletionResponse {
		id: resp.metadata.request_id.to_string(),
		model: String::new(),
		choices: vec![types::Choice {
			index: 0,
			message: Message { role: role_to_wire(resp.message.role).to_string(), content: resp.message.content.as_text() },
			finish_reason: Some(finish_reason_to_wire(resp.finish_reason).to_string()),
		}],
		usage,
	}
}

pub fn translate_dialect_request(req: ChatRequest) -> Result<IRChatRequest, BridgeError> {
	if req.messages.is_empty() {
		return Err(BridgeError::AdapterConversion { message: "request has no messages".to_string() });
	}
	let messages = req.messages.into_iter().map(|m| IRMessage::new(Role::normalize(&m.role), IRContent::text(m.content))).collect();
	let parameters = IRParameters { model: Some(req.model), temperature: req.temperature, top_p: req.top_p, max_tokens: req.max_tokens, seed: req.random_seed, ..Default::default() };
	let mut metadata = IRMetadata::new(agentbridge_core::ids::request_id());
	metadata.provenance.frontend = Some(strng::literal!("mistral"));
	let mut ir = IRChatRequest::new(messages, metadata);
	ir.parameters = Some(parameters);
	ir.stream = req.stream;
	Ok(ir)
}

pub struct MistralFrontend {
	metadata: AdapterMetadata,
}

impl Default for MistralFrontend {
	fn default() -> Self {
		Self {
			metadata: AdapterMetadata {
				name: strng::literal!("mistral"),
				version: strng::literal!("1"),
				provider: strng::literal!("mistral"),
				capabilities: Capabilities { tools: true, system_message_strategy: SystemMessageStrategy::InMessages, ..Default::default() },
				config: serde_json::Value::Null,
			},
		}
	}
}

impl FrontendAdapter<ChatRequest, ChatCompletionResponse, ChatCompletionChunk> for MistralFrontend {
	fn metadata(&self) -> &AdapterMetadata {
		&self.metadata
	}

	fn to_ir(&self, request: ChatRequest) -> Result<IRChatRequest, BridgeError> {
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
					IRStreamChunk::Content { delta, accumulated, .. } => {
						Some(ChatCompletionChunk { id, choices: vec![ChoiceDelta { index: 0, delta_content: Some(accumulated.unwrap_or(delta)), finish_reason: None }] })
					},
					IRStreamChunk::Done { finish_reason, .. } => {
						Some(ChatCompletionChunk { id, choices: vec![ChoiceDelta { index: 0, delta_content: None, finish_reason: Some(finish_reason_to_wire(finish_reason).to_string()) }] })
					},
					_ => None,
				}
			}
		}))
	}
}

pub fn from_wire_finish_reason(raw: Option<&str>) -> FinishReason {
	raw.map(finish_reason_from_wire).unwrap_or(FinishReason::Stop)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn to_ir_carries_random_seed_as_seed_param() {
		let req = ChatRequest { model: "mistral-large".to_string(), messages: vec![Message { role: "user".to_string(), content: "hi".to_string() }], random_seed: Some(7), ..Default::default() };
		let ir = translate_dialect_request(req).unwrap();
		assert_eq!(ir.parameters.unwrap().seed, Some(7));
	}
}
