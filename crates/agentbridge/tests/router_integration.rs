//! End-to-end exercises of `Router` against mocked HTTP backends: sequential
//! fallback with a `backend:failover` event, parallel first-success dispatch,
//! and model-name translation reaching the wire request (§8).

mod common;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agentbridge::adapter::BackendAdapter;
use agentbridge::config::{FallbackStrategy, ModelTranslationConfig, ModelTranslationStrategy, RouterConfig};
use agentbridge::ir::{IRChatRequest, IRMessage, IRMetadata, IRParameters};
use agentbridge::router::{ModelTranslator, ParallelDispatchOptions, ParallelStrategy};
use agentbridge::Router;
use agentbridge_core::strng;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

struct BodyContains(&'static str);

impl Match for BodyContains {
	fn matches(&self, request: &Request) -> bool {
		std::str::from_utf8(&request.body).map(|body| body.contains(self.0)).unwrap_or(false)
	}
}

fn request_with_model(model: &str) -> IRChatRequest {
	let mut req = IRChatRequest::new(vec![IRMessage::user("hi")], IRMetadata::new(strng::new("req-1")));
	req.parameters = Some(IRParameters { model: Some(model.to_string()), ..Default::default() });
	req
}

#[tokio::test]
async fn sequential_fallback_reaches_second_http_backend_and_emits_failover() {
	let down = MockServer::start().await;
	Mock::given(method("POST")).and(path("/v1/chat/completions")).respond_with(ResponseTemplate::new(500)).mount(&down).await;
	let up = MockServer::start().await;
	Mock::given(method("POST")).and(path("/v1/chat/completions")).respond_with(ResponseTemplate::new(200).set_body_json(common::openai_success_body("fallback ok"))).mount(&up).await;

	let mut config = RouterConfig::default();
	config.fallback_strategy = FallbackStrategy::Sequential;
	let router = Router::new(config);
	router.register(strng::new("primary"), Arc::new(common::openai_backend(&down).await), None).unwrap();
	router.register(strng::new("secondary"), Arc::new(common::openai_backend(&up).await), None).unwrap();
	router.set_fallback_chain(vec![strng::new("secondary")]);

	let failovers = Arc::new(AtomicUsize::new(0));
	let counter = failovers.clone();
	router.on("backend:failover", move |_event| {
		counter.fetch_add(1, Ordering::Relaxed);
	});

	let response = router.execute(request_with_model("gpt-4"), CancellationToken::new()).await.unwrap();
	assert_eq!(response.message.content.as_text(), "fallback ok");
	assert_eq!(router.total_fallbacks(), 1);
	assert_eq!(failovers.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn parallel_dispatch_returns_first_success_and_cancels_siblings() {
	let slow = MockServer::start().await;
	Mock::given(method("POST")).and(path("/v1/chat/completions")).respond_with(ResponseTemplate::new(200).set_body_json(common::openai_success_body("slow")).set_delay(Duration::from_millis(500))).mount(&slow).await;
	let fast = MockServer::start().await;
	Mock::given(method("POST")).and(path("/v1/chat/completions")).respond_with(ResponseTemplate::new(200).set_body_json(common::openai_success_body("fast"))).mount(&fast).await;

	let router = Router::new(RouterConfig::default());
	router.register(strng::new("slow"), Arc::new(common::openai_backend(&slow).await), None).unwrap();
	router.register(strng::new("fast"), Arc::new(common::openai_backend(&fast).await), None).unwrap();

	let result = router
		.dispatch_parallel(request_with_model("gpt-4"), vec![strng::new("slow"), strng::new("fast")], ParallelDispatchOptions { strategy: ParallelStrategy::First, timeout: None, cancel_on_first_success: true }, CancellationToken::new())
		.await
		.unwrap();

	assert_eq!(result.successful_backends, vec![strng::new("fast")]);
	assert_eq!(result.entries[0].backend, strng::new("fast"));
	assert!(result.entries[0].success);
}

#[tokio::test]
async fn global_model_translation_reaches_the_wire_request() {
	let server = MockServer::start().await;
	Mock::given(method("POST"))
		.and(path("/v1/chat/completions"))
		.and(BodyContains("claude-3-5-sonnet"))
		.respond_with(ResponseTemplate::new(200).set_body_json(common::openai_success_body("translated")))
		.mount(&server)
		.await;

	let mut config = RouterConfig::default();
	config.model_translation = ModelTranslationConfig { strategy: ModelTranslationStrategy::Exact, warn_on_default: false, strict_mode: false };
	let router = Router::new(config);
	router.register(strng::new("only"), Arc::new(common::openai_backend(&server).await), None).unwrap();
	router.set_model_translator(ModelTranslator::new().with_global_map(HashMap::from([("gpt-4".to_string(), "claude-3-5-sonnet".to_string())])));

	let response = router.execute(request_with_model("gpt-4"), CancellationToken::new()).await.unwrap();
	assert_eq!(response.message.content.as_text(), "translated");
}

#[tokio::test]
async fn circuit_reopens_for_half_open_then_recovers_after_timeout() {
	let server = MockServer::start().await;
	Mock::given(method("POST")).and(path("/v1/chat/completions")).up_to_n_times(2).respond_with(ResponseTemplate::new(500)).mount(&server).await;
	Mock::given(method("POST")).and(path("/v1/chat/completions")).respond_with(ResponseTemplate::new(200).set_body_json(common::openai_success_body("recovered"))).mount(&server).await;

	let mut config = RouterConfig::default();
	config.circuit_breaker_threshold = 2;
	config.circuit_breaker_timeout_ms = 50;
	config.fallback_strategy = FallbackStrategy::None;
	let router = Router::new(config);
	router.register(strng::new("only"), Arc::new(common::openai_backend(&server).await), None).unwrap();

	for _ in 0..2 {
		let _ = router.execute(request_with_model("gpt-4"), CancellationToken::new()).await;
	}
	let blocked = router.execute(request_with_model("gpt-4"), CancellationToken::new()).await.unwrap_err();
	assert_eq!(blocked.code(), "PROVIDER_UNAVAILABLE");

	tokio::time::sleep(Duration::from_millis(80)).await;

	let response = router.execute(request_with_model("gpt-4"), CancellationToken::new()).await.unwrap();
	assert_eq!(response.message.content.as_text(), "recovered");
}
