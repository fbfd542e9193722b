use std::collections::HashMap;

use agentbridge_core::strng::Strng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::IRMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamMode {
	Delta,
	Accumulated,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default)]
	pub parameters: Value,
}

/// Model-independent generation knobs. Every field is optional: a frontend only
/// populates what its dialect actually carried, and a backend only consumes what
/// its provider actually supports (declared via `Capabilities`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IRParameters {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub model: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub top_p: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub top_k: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_tokens: Option<u64>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub stop_sequences: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub seed: Option<i64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub frequency_penalty: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub presence_penalty: Option<f64>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
	Strict,
	Lenient,
}

/// Structured-output hint. Opaque to the core pipeline; only adapters that
/// understand the `schema_type` consume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaHint {
	pub schema_type: String,
	pub mode: SchemaMode,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	pub schema: Value,
}

/// Tracks which components have touched a request, for debugging and for the
/// `backend:failover` event. Populated incrementally: the frontend stamps
/// itself at `to_ir`, the backend at `execute`/`execute_stream`, the router
/// (when present) at selection time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub frontend: Option<Strng>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub backend: Option<Strng>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub router: Option<Strng>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IRMetadata {
	pub request_id: Strng,
	pub timestamp: chrono::DateTime<chrono::Utc>,
	#[serde(default)]
	pub provenance: Provenance,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider_response_id: Option<String>,
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub custom: HashMap<String, Value>,
}

impl IRMetadata {
	pub fn new(request_id: Strng) -> Self {
		Self {
			request_id,
			timestamp: chrono::Utc::now(),
			provenance: Provenance::default(),
			provider_response_id: None,
			custom: HashMap::new(),
		}
	}

	/// The explicit-routing strategy reads `metadata.custom["backend"]`.
	pub fn preferred_backend(&self) -> Option<&str> {
		self.custom.get("backend").and_then(Value::as_str)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IRChatRequest {
	pub messages: Vec<IRMessage>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parameters: Option<IRParameters>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stream: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub stream_mode: Option<StreamMode>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub schema: Option<SchemaHint>,
	pub metadata: IRMetadata,
}

impl IRChatRequest {
	pub fn new(messages: Vec<IRMessage>, metadata: IRMetadata) -> Self {
		Self { messages, parameters: None, stream: None, stream_mode: None, schema: None, metadata }
	}

	pub fn model(&self) -> Option<&str> {
		self.parameters.as_ref().and_then(|p| p.model.as_deref())
	}

	pub fn is_streaming(&self) -> bool {
		self.stream.unwrap_or(false)
	}

	/// A shallow clone suitable for per-backend mutation (e.g. model-name
	/// translation) without disturbing the caller's original request.
	pub fn shallow_clone(&self) -> Self {
		self.clone()
	}
}
