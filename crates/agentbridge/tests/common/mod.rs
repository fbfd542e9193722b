use std::sync::Arc;

use agentbridge::adapter::backends::{AnthropicDialect, HttpBackendAdapter, OpenAIDialect};
use agentbridge::adapter::Capabilities;
use wiremock::MockServer;

pub async fn openai_backend(server: &MockServer) -> HttpBackendAdapter {
	HttpBackendAdapter::new("openai", server.uri(), Arc::new(OpenAIDialect), Capabilities::default())
}

pub async fn anthropic_backend(server: &MockServer) -> HttpBackendAdapter {
	HttpBackendAdapter::new("anthropic", server.uri(), Arc::new(AnthropicDialect), Capabilities { system_message_strategy: agentbridge::adapter::SystemMessageStrategy::SeparateParameter, ..Capabilities::default() })
}

pub fn openai_success_body(text: &str) -> serde_json::Value {
	serde_json::json!({
		"id": "resp-1",
		"model": "gpt-4o",
		"choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
		"usage": {"prompt_tokens": 3, "completion_tokens": 5, "total_tokens": 8}
	})
}

pub fn anthropic_success_body(text: &str) -> serde_json::Value {
	serde_json::json!({
		"id": "msg-1",
		"model": "claude-3-5-sonnet",
		"role": "assistant",
		"content": [{"type": "text", "text": text}],
		"stop_reason": "end_turn",
		"usage": {"input_tokens": 3, "output_tokens": 5}
	})
}
