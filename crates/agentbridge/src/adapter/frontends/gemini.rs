use agentbridge_core::strng;
use futures::StreamExt;

use crate::adapter::streaming_mode::StreamModeConverter;
use crate::adapter::system_message::normalize_system_messages;
use crate::adapter::{AdapterMetadata, Capabilities, DialectChunkStream, FromIRStreamOptions, FrontendAdapter, IRChunkStream, SystemMessageStrategy};
use crate::ir::{BridgeError, FinishReason, IRChatRequest, IRChatResponse, IRContent, IRMessage, IRMetadata, IRParameters, IRStreamChunk, Role, StreamMode};

/// Gemini `generateContent` wire types, grounded on the teacher's
/// `llm::gemini` module: `contents` hold `parts` rather than a single text
/// field, and system content lives in a top-level `systemInstruction`.
pub mod types {
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Part {
		pub text: String,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Content {
		pub role: String,
		pub parts: Vec<Part>,
	}

	#[derive(Debug, Clone, Default, Serialize, Deserialize)]
	pub struct GenerationConfig {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub temperature: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub top_p: Option<f64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub top_k: Option<u64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub max_output_tokens: Option<u64>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub stop_sequences: Option<Vec<String>>,
	}

	#[derive(Debug, Clone, Default, Serialize, Deserialize)]
	pub struct GenerateContentRequest {
		pub contents: Vec<Content>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub system_instruction: Option<Content>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub generation_config: Option<GenerationConfig>,
	}

	#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
	#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
	pub enum GeminiFinishReason {
		Stop,
		MaxTokens,
		Safety,
		Other,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Candidate {
		pub content: Content,
		pub finish_reason: Option<GeminiFinishReason>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct UsageMetadata {
		pub prompt_token_count: u64,
		pub candidates_token_count: u64,
		pub total_token_count: u64,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct GenerateContentResponse {
		pub candidates: Vec<Candidate>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub usage_metadata: Option<UsageMetadata>,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct GenerateContentChunk {
		pub candidates: Vec<Candidate>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		pub usage_metadata: Option<UsageMetadata>,
	}
}

use types::{Candidate, Content, GenerateContentChunk, GenerateContentRequest, GenerateContentResponse, GeminiFinishReason, Part};

pub fn translate_request(req: IRChatRequest) -> GenerateContentRequest {
	let params = req.parameters.unwrap_or_default();
	let (messages, system) = normalize_system_messages(req.messages, SystemMessageStrategy::SeparateParameter, false);
	GenerateContentRequest {
		contents: messages.into_iter().map(|m| Content { role: role_to_wire(m.role).to_string(), parts: vec![Part { text: m.content.as_text() }] }).collect(),
		system_instruction: system.map(|entries| Content { role: "system".to_string(), parts: vec![Part { text: entries.join("\n") }] }),
		generation_config: Some(types::GenerationConfig {
			temperature: params.temperature,
			top_p: params.top_p,
			top_k: params.top_k,
			max_output_tokens: params.max_tokens,
			stop_sequences: if params.stop_sequences.is_empty() { None } else { Some(params.stop_sequences) },
		}),
	}
}

fn role_to_wire(role: Role) -> &'static str {
	match role {
		Role::Assistant => "model",
		Role::System | Role::User => "user",
	}
}

fn finish_reason_from_gemini(reason: Option<GeminiFinishReason>) -> FinishReason {
	match reason {
		Some(GeminiFinishReason::MaxTokens) => FinishReason::Length,
		Some(GeminiFinishReason::Safety) => FinishReason::ContentFilter,
		_ => FinishReason::Stop,
	}
}

fn finish_reason_to_gemini(reason: FinishReason) -> GeminiFinishReason {
	match reason {
		FinishReason::Length => GeminiFinishReason::MaxTokens,
		FinishReason::ContentFilter => GeminiFinishReason::Safety,
		FinishReason::ToolCalls => GeminiFinishReason::Other,
		FinishReason::Stop => GeminiFinishReason::Stop,
	}
}

fn candidate_text(candidate: &Candidate) -> String {
	candidate.content.parts.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("")
}

pub fn translate_response(resp: GenerateContentResponse) -> IRChatResponse {
	let metadata = IRMetadata::new(agentbridge_core::ids::request_id());
	let candidate = resp.candidates.into_iter().next();
	let text = candidate.as_ref().map(candidate_text).unwrap_or_default();
	let finish_reason = finish_reason_from_gemini(candidate.and_then(|c| c.finish_reason));
	let usage = resp.usage_metadata.map(|u| crate::ir::Usage { prompt_tokens: u.prompt_token_count, completion_tokens: u.candidates_token_count, total_tokens: u.total_token_count });
	IRChatResponse { message: IRMessage::assistant(text), finish_reason, usage, metadata, raw: None }
}

pub fn translate_dialect_request(req: GenerateContentRequest) -> Result<IRChatRequest, BridgeError> {
	if req.contents.is_empty() {
		return Err(BridgeError::AdapterConversion { message: "request has no contents".to_string() });
	}
	let mut messages: Vec<IRMessage> = Vec::new();
	if let Some(system) = &req.system_instruction {
		let text = system.parts.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("");
		messages.push(IRMessage::system(text));
	}
	for content in req.contents {
		let text = content.parts.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("");
		messages.push(IRMessage::new(Role::normalize(&content.role), IRContent::text(text)));
	}
	let config = req.generation_config.unwrap_or_default();
	let parameters = IRParameters {
		temperature: config.temperature,
		top_p: config.top_p,
		top_k: config.top_k,
		max_tokens: config.max_output_tokens,
		stop_sequences: config.stop_sequences.unwrap_or_default(),
		..Default::default()
	};
	let mut metadata = IRMetadata::new(agentbridge_core::ids::request_id());
	metadata.provenance.frontend = Some(strng::literal!("gemini"));
	let mut ir = IRChatRequest::new(messages, metadata);
	ir.parameters = Some(parameters);
	Ok(ir)
}

pub struct GeminiFrontend {
	metadata: AdapterMetadata,
}

impl Default for GeminiFrontend {
	fn default() -> Self {
		Self {
			metadata: AdapterMetadata {
				name: strng::literal!("gemini"),
				version: strng::literal!("1"),
				provider: strng::literal!("gemini"),
				capabilities: Capabilities {
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

impl FrontendAdapter<GenerateContentRequest, GenerateContentResponse, GenerateContentChunk> for GeminiFrontend {
	fn metadata(&self) -> &AdapterMetadata {
		&self.metadata
	}

	fn to_ir(&self, request: GenerateContentRequest) -> Result<IRChatRequest, BridgeError> {
		translate_dialect_request(request)
	}

	fn from_ir(&self, response: IRChatResponse) -> GenerateContentResponse {
		let usage = response.usage.unwrap_or_default();
		GenerateContentResponse {
			candidates: vec![Candidate {
				content: Content { role: "model".to_string(), parts: vec![Part { text: response.message.content.as_text() }] },
				finish_reason: Some(finish_reason_to_gemini(response.finish_reason)),
			}],
			usage_metadata: Some(types::UsageMetadata { prompt_token_count: usage.prompt_tokens, candidates_token_count: usage.completion_tokens, total_token_count: usage.total_tokens }),
		}
	}

	fn from_ir_stream(&self, stream: IRChunkStream, options: FromIRStreamOptions) -> DialectChunkStream<GenerateContentChunk> {
		let target_mode = options.stream_mode.unwrap_or(StreamMode::Accumulated);
		let mut converter = StreamModeConverter::new(StreamMode::Delta, target_mode);
		Box::pin(stream.filter_map(move |chunk| {
			let chunk = converter.convert(chunk);
			async move {
				match chunk {
					IRStreamChunk::Content { delta, accumulated, .. } => Some(GenerateContentChunk {
						candidates: vec![Candidate { content: Content { role: "model".to_string(), parts: vec![Part { text: accumulated.unwrap_or(delta) }] }, finish_reason: None }],
						usage_metadata: None,
					}),
					IRStreamChunk::Done { finish_reason, usage, .. } => Some(GenerateContentChunk {
						candidates: vec![Candidate { content: Content { role: "model".to_string(), parts: vec![] }, finish_reason: Some(finish_reason_to_gemini(finish_reason)) }],
						usage_metadata: usage.map(|u| types::UsageMetadata { prompt_token_count: u.prompt_tokens, candidates_token_count: u.completion_tokens, total_token_count: u.total_tokens }),
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
	fn to_ir_maps_model_role_to_assistant() {
		let req = GenerateContentRequest { contents: vec![Content { role: "model".to_string(), parts: vec![Part { text: "hi".to_string() }] }], ..Default::default() };
		let ir = translate_dialect_request(req).unwrap();
		assert_eq!(ir.messages[0].role, Role::Assistant);
	}

	#[test]
	fn system_instruction_becomes_leading_system_message() {
		let req = GenerateContentRequest {
			contents: vec![Content { role: "user".to_string(), parts: vec![Part { text: "hi".to_string() }] }],
			system_instruction: Some(Content { role: "system".to_string(), parts: vec![Part { text: "be terse".to_string() }] }),
			..Default::default()
		};
		let ir = translate_dialect_request(req).unwrap();
		assert_eq!(ir.messages[0].role, Role::System);
		assert_eq!(ir.messages[0].content.as_text(), "be terse");
	}
}
