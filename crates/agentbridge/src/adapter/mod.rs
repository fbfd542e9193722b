//! The Frontend/Backend Adapter Contract (§4.1): the capability-declaring
//! shape every provider plug-in satisfies, plus the system-message and
//! streaming-mode normalization utilities the pipeline consumes. Grounded on
//! the teacher's per-provider `Provider` structs (`llm::anthropic::Provider`,
//! `llm::gemini::Provider`, `llm::openai::Provider`): a small struct per
//! dialect with `process_request`/`process_response`/`process_streaming` and
//! free `translate_*` functions, here generalized behind a trait object so
//! the Bridge and Router can hold `Arc<dyn FrontendAdapter>`/`Arc<dyn
//! BackendAdapter>` looked up by string key instead of an enum.

pub mod backends;
pub mod frontends;
mod streaming_mode;
mod system_message;

pub use streaming_mode::{convert_chunk_mode, StreamModeConverter};
pub use system_message::normalize_system_messages;

use std::pin::Pin;

use agentbridge_core::strng::Strng;
use futures_core::Stream;
use tokio_util::sync::CancellationToken;

use crate::ir::{BridgeError, IRChatRequest, IRChatResponse, IRStreamChunk};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemMessageStrategy {
	InMessages,
	SeparateParameter,
	PrependUser,
	NotSupported,
}

/// Capability flags used by capability-based routing and by the system-message
/// and streaming-mode normalization layers.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Capabilities {
	pub streaming: bool,
	pub multi_modal: bool,
	pub tools: bool,
	pub max_context_tokens: Option<u64>,
	pub system_message_strategy: SystemMessageStrategy,
	pub supports_multiple_system_messages: bool,
	pub supports_temperature: bool,
	pub supports_top_p: bool,
	pub supports_top_k: bool,
	pub supports_frequency_penalty: bool,
	pub supports_presence_penalty: bool,
	pub supports_seed: bool,
	pub max_stop_sequences: Option<u32>,
}

impl Default for Capabilities {
	fn default() -> Self {
		Self {
			streaming: true,
			multi_modal: false,
			tools: false,
			max_context_tokens: None,
			system_message_strategy: SystemMessageStrategy::InMessages,
			supports_multiple_system_messages: true,
			supports_temperature: true,
			supports_top_p: true,
			supports_top_k: false,
			supports_frequency_penalty: false,
			supports_presence_penalty: false,
			supports_seed: false,
			max_stop_sequences: None,
		}
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdapterMetadata {
	pub name: Strng,
	pub version: Strng,
	pub provider: Strng,
	pub capabilities: Capabilities,
	#[serde(default)]
	pub config: serde_json::Value,
}

/// Information returned by `BackendAdapter::list_models`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModelInfo {
	pub id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub display_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_context_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ListModelsOptions {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh: Option<bool>,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ListModelsResult {
	pub models: Vec<ModelInfo>,
	pub provider: Strng,
}

pub type IRChunkStream = Pin<Box<dyn Stream<Item = IRStreamChunk> + Send>>;
pub type DialectChunkStream<DChunk> = Pin<Box<dyn Stream<Item = DChunk> + Send>>;

/// Options consumed by `fromIRStream` controlling the dialect-facing chunk
/// sequence's delta/accumulated mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct FromIRStreamOptions {
	pub stream_mode: Option<crate::ir::StreamMode>,
}

/// Converts between one provider dialect and the IR. Pure: no network I/O,
/// no mutable state beyond what's captured at construction (e.g. a
/// configured default model name).
pub trait FrontendAdapter<DReq, DResp, DChunk>: Send + Sync {
	fn metadata(&self) -> &AdapterMetadata;

	/// Fails with `BridgeError::AdapterConversion` when `request` is malformed.
	/// Assigns a fresh `request_id` and stamps `provenance.frontend`.
	fn to_ir(&self, request: DReq) -> Result<IRChatRequest, BridgeError>;

	/// Denormalization is total: must not fail for any valid IR response.
	fn from_ir(&self, response: IRChatResponse) -> DResp;

	/// Lazily re-emits an IR chunk stream in dialect form, honoring the
	/// requested streaming mode via [`convert_chunk_mode`].
	fn from_ir_stream(&self, stream: IRChunkStream, options: FromIRStreamOptions) -> DialectChunkStream<DChunk>;
}

/// Executes IR requests against a provider (or, for the Router, against a
/// registry of providers). Network-bearing; implementations hold their own
/// long-lived client state (connection pools, auth).
#[async_trait::async_trait]
pub trait BackendAdapter: Send + Sync {
	fn metadata(&self) -> &AdapterMetadata;

	/// One round trip. Stamps `provenance.backend` and
	/// `metadata.custom["latencyMs"]`. Must observe `cancel`: an already
	/// cancelled token (or one cancelled mid-flight) yields
	/// `BridgeError::Cancelled` promptly rather than after the full I/O
	/// completes.
	async fn execute(&self, request: IRChatRequest, cancel: CancellationToken) -> Result<IRChatResponse, BridgeError>;

	/// Returns lazily. The first chunk may be `Start`; the stream yields
	/// exactly one of `Done`/`Error` before ending. Cancellation produces a
	/// prompt terminal error chunk rather than silently truncating.
	async fn execute_stream(&self, request: IRChatRequest, cancel: CancellationToken) -> Result<IRChunkStream, BridgeError>;

	async fn health_check(&self) -> bool {
		true
	}

	/// `None` when the backend has no cost model; `Some(0.0)` is a legitimate
	/// free-tier answer and distinct from "unknown".
	fn estimate_cost(&self, _request: &IRChatRequest) -> Option<f64> {
		None
	}

	async fn list_models(&self, _options: ListModelsOptions) -> Result<ListModelsResult, BridgeError> {
		Ok(ListModelsResult { models: Vec::new(), provider: self.metadata().provider.clone() })
	}

	/// Releases any long-lived resources (HTTP clients, connections). A
	/// no-op default suits adapters with nothing to release; the Router
	/// overrides this to dispose every registered backend.
	async fn dispose(&self) {}
}
