//! End-to-end exercises of `Bridge` against a mocked HTTP backend: a
//! cross-dialect unary round trip (OpenAI frontend, Anthropic backend) and a
//! streaming request with delta/accumulated mode conversion (§8).

mod common;

use std::sync::Arc;

use agentbridge::adapter::backends::AnthropicDialect;
use agentbridge::adapter::frontends::openai::types::{ChatCompletionRequest, Message};
use agentbridge::adapter::frontends::OpenAIFrontend;
use agentbridge::adapter::{BackendAdapter, Capabilities, FromIRStreamOptions, SystemMessageStrategy};
use agentbridge::config::BridgeConfig;
use agentbridge::ir::StreamMode;
use agentbridge::Bridge;
use futures::StreamExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_request(text: &str, stream: bool) -> ChatCompletionRequest {
	ChatCompletionRequest { model: "gpt-4".to_string(), messages: vec![Message { role: "user".to_string(), content: Some(text.to_string()), name: None }], stream: Some(stream), ..Default::default() }
}

#[tokio::test]
async fn unary_request_crosses_openai_frontend_to_anthropic_backend() {
	let server = MockServer::start().await;
	Mock::given(method("POST")).and(path("/v1/messages")).respond_with(ResponseTemplate::new(200).set_body_json(common::anthropic_success_body("hello from claude"))).mount(&server).await;

	let backend = agentbridge::adapter::backends::HttpBackendAdapter::new(
		"anthropic",
		server.uri(),
		Arc::new(AnthropicDialect),
		Capabilities { system_message_strategy: SystemMessageStrategy::SeparateParameter, ..Capabilities::default() },
	);
	let bridge = Bridge::new(OpenAIFrontend::default(), Arc::new(backend) as Arc<dyn BackendAdapter>, BridgeConfig::default());

	let response = bridge.chat(openai_request("hi", false)).await.unwrap();
	assert_eq!(response.choices[0].message.content.as_deref(), Some("hello from claude"));
	assert_eq!(bridge.get_stats().total_requests, 1);
}

#[tokio::test]
async fn chat_stream_converts_delta_chunks_to_accumulated_mode() {
	let server = MockServer::start().await;
	let sse = "data: {\"id\":\"c1\",\"model\":\"gpt-4\",\"choices\":[{\"index\":0,\"content\":\"he\"}]}\n\n\
	           data: {\"id\":\"c1\",\"model\":\"gpt-4\",\"choices\":[{\"index\":0,\"content\":\"llo\"}]}\n\n\
	           data: {\"id\":\"c1\",\"model\":\"gpt-4\",\"choices\":[{\"index\":0,\"finish_reason\":\"stop\"}]}\n\n\
	           data: [DONE]\n\n";
	Mock::given(method("POST")).and(path("/v1/chat/completions")).respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream")).mount(&server).await;

	let backend = common::openai_backend(&server).await;
	let bridge = Bridge::new(OpenAIFrontend::default(), Arc::new(backend) as Arc<dyn BackendAdapter>, BridgeConfig::default());

	let mut stream = bridge.chat_stream(openai_request("hi", true), FromIRStreamOptions { stream_mode: Some(StreamMode::Accumulated) }).await.unwrap();

	let mut last_content = String::new();
	while let Some(chunk) = stream.next().await {
		if let Some(content) = chunk.choices[0].content.clone() {
			last_content = content;
		}
	}
	assert_eq!(last_content, "hello");
}
