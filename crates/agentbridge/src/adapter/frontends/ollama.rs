use agentbridge_core::strng;
use futures::StreamExt;

use crate::adapter::streaming_mode::StreamModeConverter;
use crate::adapter::{AdapterMetadata, Capabilities, DialectChunkStream, FromIRStreamOptions, FrontendAdapter, IRChunkStream, SystemMessageStrategy};
use crate::ir::{BridgeError, FinishReason, IRChatRequest, IRChatResponse, IRContent, IRMessage, IRMetadata, IRParameters, IRStreamChunk, Role, StreamMode};

/// Ollama `/api/chat` wire types — an OpenAI-shaped message list but with a
/// nested `options` bag for sampling parameters and `done`/`done_reason`
/// instead of a `finish_reason` field.
pub mod types {
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Message {
		pub role: String,
		pub content: String,
	}

	#[derive(Debug, Clone, Default, Serialize, Deserialize)]
	pub struct Options {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub temperature: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub top_p: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub top_k: Option<u64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub num_predict: Option<u64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub stop: Option<Vec<String>>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub seed: Option<i64>,
	}

	#[derive(Debug, Clone, Default, Serialize, Deserialize)]
	pub struct ChatRequest {
		pub model: String,
		pub messages: Vec<Message>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub options: Option<Options>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub stream: Option<bool>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct ChatResponse {
		pub model: String,
		pub message: Message,
		pub done: bool,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub done_reason: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub prompt_eval_count: Option<u64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub eval_count: Option<u64>,
	}

	pub type ChatChunk = ChatResponse;
}

use types::{ChatRequest, ChatResponse, Message};

pub fn translate_request(req: IRChatRequest) -> ChatRequest {
	let params = req.parameters.unwrap_or_default();
	ChatRequest {
		model: params.model.unwrap_or_default(),
		messages: req.messages.into_iter().map(|m| Message { role: role_to_wire(m.role).to_string(), content: m.content.as_text() }).collect(),
		options: Some(types::Options {
			temperature: params.temperature,
			top_p: params.top_p,
			top_k: params.top_k,
			num_predict: params.max_tokens,
			stop: if params.stop_sequences.is_empty() { None } else { Some(params.stop_sequences) },
			seed: params.seed,
		}),
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

pub fn translate_response(resp: IRChatResponse) -> ChatResponse {
	let usage = resp.usage.unwrap_or_default();
	ChatResponse {
		model: String::new(),
		message: Message { role: role_to_wire(resp.message.role).to_string(), content: resp.message.content.as_text() },
		done: true,
		done_reason: Some(finish_reason_to_wire(resp.finish_reason).to_string()),
		prompt_eval_count: Some(usage.prompt_tokens),
		eval_count: Some(usage.completion_tokens),
	}
}

fn finish_reason_to_wire(reason: FinishReason) -> &'static str {
	match reason {
		FinishReason::Length => "length",
		FinishReason::ContentFilter => "content_filter",
		FinishReason::ToolCalls => "tool_calls",
		FinishReason::Stop => "stop",
	}
}

pub fn translate_dialect_request(req: ChatRequest) -> Result<IRChatRequest, BridgeError> {
	if req.messages.is_empty() {
		return Err(BridgeError::AdapterConversion { message: "request has no messages".to_string() });
	}
	let messages = req.messages.into_iter().map(|m| IRMessage::new(Role::normalize(&m.role), IRContent::text(m.content))).collect();
	let options = req.options.unwrap_or_default();
	let parameters = IRParameters {
		model: Some(req.model),
		temperature: options.temperature,
		top_p: options.top_p,
		top_k: options.top_k,
		max_tokens: options.num_predict,
		stop_sequences: options.stop.unwrap_or_default(),
		seed: options.seed,
		..Default::default()
	};
	let mut metadata = IRMetadata::new(agentbridge_core::ids::request_id());
	metadata.provenance.frontend = Some(strng::literal!("ollama"));
	let mut ir = IRChatRequest::new(messages, metadata);
	ir.parameters = Some(parameters);
	ir.stream = req.stream;
	Ok(ir)
}

pub struct OllamaFrontend {
	metadata: AdapterMetadata,
}

impl Default for OllamaFrontend {
	fn default() -> Self {
		Self {
			metadata: AdapterMetadata {
				name: strng::literal!("ollama"),
				version: strng::literal!("1"),
				provider: strng::literal!("ollama"),
				capabilities: Capabilities { system_message_strategy: SystemMessageStrategy::InMessages, supports_top_k: true, max_context_tokens: None, ..Default::default() },
				config: serde_json::Value::Null,
			},
		}
	}
}

impl FrontendAdapter<ChatRequest, ChatResponse, ChatResponse> for OllamaFrontend {
	fn metadata(&self) -> &AdapterMetadata {
		&self.metadata
	}

	fn to_ir(&self, request: ChatRequest) -> Result<IRChatRequest, BridgeError> {
		translate_dialect_request(request)
	}

	fn from_ir(&self, response: IRChatResponse) -> ChatResponse {
		translate_response(response)
	}

	fn from_ir_stream(&self, stream: IRChunkStream, options: FromIRStreamOptions) -> DialectChunkStream<ChatResponse> {
		let target_mode = options.stream_mode.unwrap_or(StreamMode::Delta);
		let mut converter = StreamModeConverter::new(StreamMode::Delta, target_mode);
		Box::pin(stream.filter_map(move |chunk| {
			let chunk = converter.convert(chunk);
			async move {
				match chunk {
					IRStreamChunk::Content { delta, role, accumulated, .. } => Some(ChatResponse {
						model: String::new(),
						message: Message { role: role_to_wire(role).to_string(), content: accumulated.unwrap_or(delta) },
						done: false,
						done_reason: None,
						prompt_eval_count: None,
						eval_count: None,
					}),
					IRStreamChunk::Done { finish_reason, usage, .. } => Some(ChatResponse {
						model: String::new(),
						message: Message { role: "assistant".to_string(), content: String::new() },
						done: true,
						done_reason: Some(finish_reason_to_wire(finish_reason).to_string()),
						prompt_eval_count: usage.map(|u| u.prompt_tokens),
						eval_count: usage.map(|u| u.completion_tokens),
					}),
					_ => None,
				}
			}
		}))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn to_ir_reads_sampling_options() {
		let req = ChatRequest {
			model: "llama3".to_string(),
			messages: vec![Message { role: "user".to_string(), content: "hi".to_string() }],
			options: Some(types::Options { temperature: Some(0.2), ..Default::default() }),
			stream: Some(false),
		};
		let ir = translate_dialect_request(req).unwrap();
		assert_eq!(ir.parameters.unwrap().temperature, Some(0.2));
	}
}
