use agentbridge_core::strng::Strng;

use super::request::Provenance;

/// The crate-wide error taxonomy (§7). One enum, `thiserror`-derived messages,
/// an `is_retryable()` inherent method consulted by the retry middleware and
/// the circuit breaker — mirroring the teacher's `AIError`/`ProxyError` split
/// of "what went wrong" from "should we try again".
#[derive(thiserror::Error, Debug, Clone)]
pub enum BridgeError {
	#[error("authentication failed: {message}")]
	Authentication { message: String },

	#[error("rate limited, retry after {retry_after_ms:?}ms")]
	RateLimit { retry_after_ms: Option<u64> },

	#[error("validation failed: {message}")]
	Validation { message: String, field: Option<String> },

	#[error("provider error: {message}")]
	Provider { message: String, retryable: bool },

	#[error("network error: {message}")]
	Network { message: String },

	#[error("stream error ({code}): {message}")]
	Stream { code: String, message: String },

	#[error("adapter conversion failed: {message}")]
	AdapterConversion { message: String },

	#[error("routing failed: {message}")]
	Routing { message: String },

	#[error("no backend available")]
	NoBackendAvailable,

	#[error("backend '{backend}' circuit is open")]
	ProviderUnavailable { backend: String },

	#[error("all backends failed: {0}")]
	AllBackendsFailed(Box<ProvenancedError>),

	#[error("request cancelled")]
	Cancelled,
}

impl BridgeError {
	pub fn is_retryable(&self) -> bool {
		match self {
			BridgeError::Authentication { .. } => false,
			BridgeError::RateLimit { .. } => true,
			BridgeError::Validation { .. } => false,
			BridgeError::Provider { retryable, .. } => *retryable,
			BridgeError::Network { .. } => true,
			BridgeError::Stream { .. } => true,
			BridgeError::AdapterConversion { .. } => false,
			BridgeError::Routing { .. } => false,
			BridgeError::NoBackendAvailable => false,
			BridgeError::ProviderUnavailable { .. } => true,
			BridgeError::AllBackendsFailed(_) => true,
			BridgeError::Cancelled => false,
		}
	}

	/// A short machine-readable code, used as the `error.code` field of a
	/// streaming terminal chunk and as a stats/telemetry label.
	pub fn code(&self) -> &'static str {
		match self {
			BridgeError::Authentication { .. } => "AUTHENTICATION_ERROR",
			BridgeError::RateLimit { .. } => "RATE_LIMIT_ERROR",
			BridgeError::Validation { .. } => "VALIDATION_ERROR",
			BridgeError::Provider { .. } => "PROVIDER_ERROR",
			BridgeError::Network { .. } => "NETWORK_ERROR",
			BridgeError::Stream { code, .. } => {
				// Distinguish the well-known interrupted case for callers that
				// only want to pattern-match on the code string.
				if code == "STREAM_INTERRUPTED" { "STREAM_INTERRUPTED" } else { "STREAM_ERROR" }
			},
			BridgeError::AdapterConversion { .. } => "ADAPTER_CONVERSION_ERROR",
			BridgeError::Routing { .. } => "ROUTING_FAILED",
			BridgeError::NoBackendAvailable => "NO_BACKEND_AVAILABLE",
			BridgeError::ProviderUnavailable { .. } => "PROVIDER_UNAVAILABLE",
			BridgeError::AllBackendsFailed(_) => "ALL_BACKENDS_FAILED",
			BridgeError::Cancelled => "CANCELLED",
		}
	}

	pub fn stream_interrupted() -> Self {
		BridgeError::Stream { code: "STREAM_INTERRUPTED".to_string(), message: "upstream disconnected before a terminal chunk was received".to_string() }
	}

	pub fn provider_unavailable(backend: &Strng) -> Self {
		BridgeError::ProviderUnavailable { backend: backend.to_string() }
	}

	pub fn no_translation(model: &str) -> Self {
		BridgeError::Routing { message: format!("no model translation found for '{model}' and strictMode is set") }
	}
}

/// A wrapper pairing an error with the provenance at the point of failure.
/// The Router attaches the primary backend's `Provenance` to the first error
/// it saw before exhausting its fallback chain, so `AllBackendsFailed` keeps
/// that error as its `cause` rather than discarding which backend it came
/// from.
#[derive(Debug, Clone)]
pub struct ProvenancedError {
	pub error: BridgeError,
	pub provenance: Provenance,
}

impl std::fmt::Display for ProvenancedError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.provenance.backend.as_ref() {
			Some(backend) => write!(f, "{} (backend: {backend})", self.error),
			None => write!(f, "{}", self.error),
		}
	}
}
