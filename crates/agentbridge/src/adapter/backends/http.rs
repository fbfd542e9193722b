use std::sync::Arc;
use std::time::Instant;

use agentbridge_core::strng::Strng;
use eventsource_stream::Eventsource;
use futures::stream::StreamExt;
use tokio_util::sync::CancellationToken;

use super::dialect::BackendDialect;
use crate::adapter::{AdapterMetadata, Capabilities, IRChunkStream};
use crate::ir::BridgeError;
use crate::ir::{IRChatRequest, IRChatResponse, IRStreamChunk};

/// Reference `BackendAdapter`: POSTs the dialect's wire JSON over `reqwest`,
/// parsing non-streaming responses as plain JSON bodies and streaming
/// responses as SSE via `eventsource-stream`. Grounded on the teacher's use
/// of `reqwest::Client` as the long-lived, pool-owning HTTP client each
/// backend adapter keeps for itself (§4.4's "Shared-resource policy").
pub struct HttpBackendAdapter {
	client: reqwest::Client,
	base_url: String,
	auth_header: Option<(String, String)>,
	dialect: Arc<dyn BackendDialect>,
	metadata: AdapterMetadata,
}

impl HttpBackendAdapter {
	pub fn new(name: impl Into<Strng>, base_url: impl Into<String>, dialect: Arc<dyn BackendDialect>, capabilities: Capabilities) -> Self {
		let name = name.into();
		Self {
			client: reqwest::Client::new(),
			base_url: base_url.into(),
			auth_header: None,
			dialect,
			metadata: AdapterMetadata { provider: name.clone(), name, version: agentbridge_core::strng::literal!("1"), capabilities, config: serde_json::Value::Null },
		}
	}

	pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
		self.auth_header = Some(("Authorization".to_string(), format!("Bearer {}", token.into())));
		self
	}

	fn url(&self) -> String {
		format!("{}{}", self.base_url, self.dialect.path())
	}

	fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		match &self.auth_header {
			Some((name, value)) => builder.header(name.as_str(), value.as_str()),
			None => builder,
		}
	}

	fn classify_status(status: reqwest::StatusCode, body: &str) -> BridgeError {
		match status.as_u16() {
			401 | 403 => BridgeError::Authentication { message: format!("provider returned {status}: {body}") },
			429 => BridgeError::RateLimit { retry_after_ms: None },
			500..=599 => BridgeError::Provider { message: format!("provider returned {status}: {body}"), retryable: true },
			_ => BridgeError::Provider { message: format!("provider returned {status}: {body}"), retryable: false },
		}
	}
}

#[async_trait::async_trait]
impl crate::adapter::BackendAdapter for HttpBackendAdapter {
	fn metadata(&self) -> &AdapterMetadata {
		&self.metadata
	}

	async fn execute(&self, request: IRChatRequest, cancel: CancellationToken) -> Result<IRChatResponse, BridgeError> {
		let started = Instant::now();
		let body = self.dialect.to_wire_request(request);
		let send = self.apply_auth(self.client.post(self.url()).json(&body)).send();

		let response = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(BridgeError::Cancelled),
			result = send => result.map_err(|e| BridgeError::Network { message: e.to_string() })?,
		};

		let status = response.status();
		if !status.is_success() {
			let text = response.text().await.unwrap_or_default();
			return Err(Self::classify_status(status, &text));
		}

		let bytes = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(BridgeError::Cancelled),
			result = response.bytes() => result.map_err(|e| BridgeError::Network { message: e.to_string() })?,
		};

		let mut ir = self.dialect.from_wire_response(&bytes)?;
		ir.metadata.custom.insert("latencyMs".to_string(), serde_json::json!(started.elapsed().as_millis() as u64));
		Ok(ir)
	}

	async fn execute_stream(&self, request: IRChatRequest, cancel: CancellationToken) -> Result<IRChunkStream, BridgeError> {
		let body = self.dialect.to_wire_request(request);
		let send = self.apply_auth(self.client.post(self.url()).json(&body)).send();

		let response = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(BridgeError::Cancelled),
			result = send => result.map_err(|e| BridgeError::Network { message: e.to_string() })?,
		};

		let status = response.status();
		if !status.is_success() {
			let text = response.text().await.unwrap_or_default();
			return Err(Self::classify_status(status, &text));
		}

		let dialect = self.dialect.clone();
		let byte_stream = response.bytes_stream();
		let mut sequence = 0u64;
		let mut terminated = false;

		let events = byte_stream.eventsource();
		let chunks = events
			.filter_map(move |event| {
				let dialect = dialect.clone();
				let cancel = cancel.clone();
				async move {
					if terminated {
						return None;
					}
					if cancel.is_cancelled() {
						terminated = true;
						return Some(IRStreamChunk::error("CANCELLED", "request cancelled"));
					}
					let event = match event {
						Ok(e) => e,
						Err(e) => {
							terminated = true;
							return Some(IRStreamChunk::error("STREAM_ERROR", e.to_string()));
						},
					};
					if event.data == "[DONE]" {
						return None;
					}
					let chunk = dialect.from_wire_event(sequence, &event.data);
					if let Some(IRStreamChunk::Content { .. }) = &chunk {
						sequence += 1;
					}
					if matches!(chunk, Some(ref c) if c.is_terminal()) {
						terminated = true;
					}
					chunk
				}
			})
			.boxed();

		Ok(chunks)
	}

	async fn health_check(&self) -> bool {
		self.client.get(&self.base_url).send().await.is_ok()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use tokio_util::sync::CancellationToken;
	use wiremock::matchers::{method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	use super::*;
	use crate::adapter::backends::OpenAIDialect;
	use crate::adapter::BackendAdapter;
	use crate::ir::{IRChatRequest, IRMessage, IRMetadata};

	fn request() -> IRChatRequest {
		IRChatRequest::new(vec![IRMessage::user("hi")], IRMetadata::new(agentbridge_core::ids::request_id()))
	}

	#[tokio::test]
	async fn execute_parses_successful_response() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/chat/completions"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"id": "resp-1",
				"model": "gpt-4o",
				"choices": [{"index": 0, "message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}],
				"usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
			})))
			.mount(&server)
			.await;

		let backend = HttpBackendAdapter::new("openai", server.uri(), Arc::new(OpenAIDialect), Capabilities::default());
		let resp = backend.execute(request(), CancellationToken::new()).await.unwrap();
		assert_eq!(resp.message.content.as_text(), "hello");
	}

	#[tokio::test]
	async fn execute_classifies_rate_limit_as_retryable() {
		let server = MockServer::start().await;
		Mock::given(method("POST")).and(path("/v1/chat/completions")).respond_with(ResponseTemplate::new(429)).mount(&server).await;

		let backend = HttpBackendAdapter::new("openai", server.uri(), Arc::new(OpenAIDialect), Capabilities::default());
		let err = backend.execute(request(), CancellationToken::new()).await.unwrap_err();
		assert!(err.is_retryable());
	}

	#[tokio::test]
	async fn execute_respects_cancellation() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v1/chat/completions"))
			.respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(5)))
			.mount(&server)
			.await;

		let backend = HttpBackendAdapter::new("openai", server.uri(), Arc::new(OpenAIDialect), Capabilities::default());
		let token = CancellationToken::new();
		token.cancel();
		let err = backend.execute(request(), token).await.unwrap_err();
		assert!(matches!(err, BridgeError::Cancelled));
	}
}
