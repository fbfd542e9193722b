//! The Middleware Stack (§4.2): an ordered around-advice pipeline. No direct
//! teacher analog exists (the closest, `llm::policy::Policy`, is a single
//! narrow webhook/regex prompt guard, not a general chain) — the chain shape
//! here follows the idiomatic Rust middle-ground between tower's `Service`
//! layering and a hand-rolled recursive dispatcher, built from primitives the
//! teacher already depends on (`async-trait` for the object-safe boundary,
//! `Arc` for cheap sharing across concurrent requests).

pub mod caching;
pub mod cost;
pub mod history_compaction;
pub mod logging;
pub mod retry;
pub mod security;
pub mod telemetry;
pub mod transform;
pub mod validation;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use agentbridge_core::strng::Strng;
use futures_core::Future;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::adapter::IRChunkStream;
use crate::ir::{BridgeError, IRChatRequest, IRChatResponse};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Mutable state threaded through the middleware chain. `request` is
/// replaceable in place (a middleware may rewrite it before calling `next`);
/// `attachments` lets one middleware pass data to a later one (e.g. caching
/// writing the fingerprint it computed for telemetry to read).
pub struct Context {
	pub request: IRChatRequest,
	pub backend: Option<Strng>,
	pub start_time: Instant,
	pub cancel: CancellationToken,
	pub attachments: HashMap<String, Value>,
}

impl Context {
	pub fn new(request: IRChatRequest) -> Self {
		Self { request, backend: None, start_time: Instant::now(), cancel: CancellationToken::new(), attachments: HashMap::new() }
	}

	pub fn elapsed_ms(&self) -> u64 {
		self.start_time.elapsed().as_millis() as u64
	}
}

pub type BackendCall = Arc<dyn Fn(Context) -> BoxFuture<Result<IRChatResponse, BridgeError>> + Send + Sync>;
pub type BackendStreamCall = Arc<dyn Fn(Context) -> BoxFuture<Result<IRChunkStream, BridgeError>> + Send + Sync>;

/// The continuation a middleware calls to invoke the rest of the chain.
/// Omitting the call short-circuits: the middleware synthesizes the response
/// itself (e.g. a cache hit, a validation rejection).
pub struct Next {
	pub(crate) middlewares: Arc<Vec<Arc<dyn Middleware>>>,
	pub(crate) index: usize,
	pub(crate) backend: BackendCall,
}

impl Next {
	pub fn call(self, ctx: Context) -> BoxFuture<Result<IRChatResponse, BridgeError>> {
		dispatch(self.middlewares, self.index, ctx, self.backend)
	}
}

pub struct NextStream {
	middlewares: Arc<Vec<Arc<dyn Middleware>>>,
	index: usize,
	backend: BackendStreamCall,
}

impl NextStream {
	pub fn call(self, ctx: Context) -> BoxFuture<Result<IRChunkStream, BridgeError>> {
		dispatch_stream(self.middlewares, self.index, ctx, self.backend)
	}
}

pub(crate) fn dispatch(middlewares: Arc<Vec<Arc<dyn Middleware>>>, index: usize, ctx: Context, backend: BackendCall) -> BoxFuture<Result<IRChatResponse, BridgeError>> {
	if index >= middlewares.len() {
		return backend(ctx);
	}
	let mw = middlewares[index].clone();
	let next = Next { middlewares: middlewares.clone(), index: index + 1, backend };
	Box::pin(async move { mw.handle(ctx, next).await })
}

fn dispatch_stream(middlewares: Arc<Vec<Arc<dyn Middleware>>>, index: usize, ctx: Context, backend: BackendStreamCall) -> BoxFuture<Result<IRChunkStream, BridgeError>> {
	if index >= middlewares.len() {
		return backend(ctx);
	}
	let mw = middlewares[index].clone();
	let next = NextStream { middlewares: middlewares.clone(), index: index + 1, backend };
	Box::pin(async move { mw.handle_stream(ctx, next).await })
}

#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
	/// A human-readable name, used in logging/telemetry attribution and in
	/// the `backend:failover` event's middleware trail.
	fn name(&self) -> &str;

	async fn handle(&self, ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError>;

	/// Streaming dispatch hook. The default passes through unchanged, which
	/// is correct for any middleware that only inspects the final response
	/// (§4.2: "middlewares that only need the final response should
	/// explicitly opt out of streaming").
	async fn handle_stream(&self, ctx: Context, next: NextStream) -> Result<IRChunkStream, BridgeError> {
		next.call(ctx).await
	}
}

/// An ordered list of middlewares folded into a single around-advice chain
/// at dispatch time. Cheap to clone (`Arc<Vec<_>>` inside): the Bridge holds
/// one and reuses it across every request.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
	middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareStack {
	pub fn new() -> Self {
		Self { middlewares: Arc::new(Vec::new()) }
	}

	pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
		Arc::make_mut(&mut self.middlewares).push(middleware);
		self
	}

	pub fn run(&self, ctx: Context, backend: BackendCall) -> BoxFuture<Result<IRChatResponse, BridgeError>> {
		dispatch(self.middlewares.clone(), 0, ctx, backend)
	}

	pub fn run_stream(&self, ctx: Context, backend: BackendStreamCall) -> BoxFuture<Result<IRChunkStream, BridgeError>> {
		dispatch_stream(self.middlewares.clone(), 0, ctx, backend)
	}

	pub fn len(&self) -> usize {
		self.middlewares.len()
	}

	pub fn is_empty(&self) -> bool {
		self.middlewares.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ir::{FinishReason, IRMessage, IRMetadata};

	struct Passthrough;

	#[async_trait::async_trait]
	impl Middleware for Passthrough {
		fn name(&self) -> &str {
			"passthrough"
		}

		async fn handle(&self, ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError> {
			next.call(ctx).await
		}
	}

	struct ShortCircuit;

	#[async_trait::async_trait]
	impl Middleware for ShortCircuit {
		fn name(&self) -> &str {
			"short-circuit"
		}

		async fn handle(&self, ctx: Context, _next: Next) -> Result<IRChatResponse, BridgeError> {
			Ok(IRChatResponse { message: IRMessage::assistant("cached"), finish_reason: FinishReason::Stop, usage: None, metadata: ctx.request.metadata, raw: None })
		}
	}

	fn backend_echo() -> BackendCall {
		Arc::new(|ctx: Context| {
			Box::pin(async move {
				Ok(IRChatResponse { message: IRMessage::assistant("from-backend"), finish_reason: FinishReason::Stop, usage: None, metadata: ctx.request.metadata, raw: None })
			})
		})
	}

	fn req() -> IRChatRequest {
		IRChatRequest::new(vec![IRMessage::user("hi")], IRMetadata::new(agentbridge_core::ids::request_id()))
	}

	#[tokio::test]
	async fn empty_stack_calls_backend_directly() {
		let stack = MiddlewareStack::new();
		let resp = stack.run(Context::new(req()), backend_echo()).await.unwrap();
		assert_eq!(resp.message.content.as_text(), "from-backend");
	}

	#[tokio::test]
	async fn middleware_can_call_next() {
		let mut stack = MiddlewareStack::new();
		stack.use_middleware(Arc::new(Passthrough));
		let resp = stack.run(Context::new(req()), backend_echo()).await.unwrap();
		assert_eq!(resp.message.content.as_text(), "from-backend");
	}

	#[tokio::test]
	async fn middleware_can_short_circuit() {
		let mut stack = MiddlewareStack::new();
		stack.use_middleware(Arc::new(ShortCircuit));
		stack.use_middleware(Arc::new(Passthrough));
		let resp = stack.run(Context::new(req()), backend_echo()).await.unwrap();
		assert_eq!(resp.message.content.as_text(), "cached");
	}
}
