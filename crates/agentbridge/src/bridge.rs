use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::adapter::{BackendAdapter, DialectChunkStream, FromIRStreamOptions, FrontendAdapter, IRChunkStream};
use crate::config::BridgeConfig;
use crate::events::{Event, EventEmitter};
use crate::ir::{BridgeError, IRStreamChunk};
use crate::middleware::{BackendCall, BackendStreamCall, Context, MiddlewareStack};
use crate::stats::{Counters, StatsSnapshot};

/// Composes one `FrontendAdapter`, one `BackendAdapter` (which may be a
/// `Router`), a middleware stack, config, and an event emitter (§4.3). The
/// Bridge never retries and never fails over — those are the retry
/// middleware's and the Router's jobs respectively; it only surfaces the
/// typed error from the inner pipeline.
pub struct Bridge<DReq, DResp, DChunk, F: FrontendAdapter<DReq, DResp, DChunk>> {
	frontend: F,
	backend: Arc<dyn BackendAdapter>,
	middleware: MiddlewareStack,
	config: BridgeConfig,
	events: Arc<EventEmitter>,
	stats: Arc<Mutex<Counters>>,
	_marker: PhantomData<(DReq, DResp, DChunk)>,
}

impl<DReq, DResp, DChunk, F> Bridge<DReq, DResp, DChunk, F>
where
	F: FrontendAdapter<DReq, DResp, DChunk>,
	DReq: Send + 'static,
	DResp: Send + 'static,
	DChunk: Send + 'static,
{
	pub fn new(frontend: F, backend: Arc<dyn BackendAdapter>, config: BridgeConfig) -> Self {
		Self { frontend, backend, middleware: MiddlewareStack::new(), config, events: Arc::new(EventEmitter::new()), stats: Arc::new(Mutex::new(Counters::new())), _marker: PhantomData }
	}

	pub fn use_middleware(&mut self, middleware: Arc<dyn crate::middleware::Middleware>) -> &mut Self {
		self.middleware.use_middleware(middleware);
		self
	}

	pub fn on(&self, kind: &'static str, listener: impl Fn(&Event) + Send + Sync + 'static) -> &Self {
		self.events.on(kind, listener);
		self
	}

	pub fn get_stats(&self) -> StatsSnapshot {
		StatsSnapshot::from(&*self.stats.lock())
	}

	fn backend_call(&self) -> BackendCall {
		let backend = self.backend.clone();
		Arc::new(move |ctx: Context| {
			let backend = backend.clone();
			Box::pin(async move { backend.execute(ctx.request, ctx.cancel).await })
		})
	}

	fn backend_stream_call(&self) -> BackendStreamCall {
		let backend = self.backend.clone();
		Arc::new(move |ctx: Context| {
			let backend = backend.clone();
			Box::pin(async move { backend.execute_stream(ctx.request, ctx.cancel).await })
		})
	}

	/// `toIR` → middleware stack → `backend.execute` → `fromIR`. Assigns a
	/// timeout-bound cancellation token; a timeout cancels the in-flight
	/// backend call rather than merely abandoning the Rust future, so
	/// `BackendAdapter` implementations see it via their `cancel` parameter.
	pub async fn chat(&self, dialect_request: DReq) -> Result<DResp, BridgeError> {
		let ir_request = self.frontend.to_ir(dialect_request)?;
		let request_id = ir_request.metadata.request_id.clone();
		self.events.emit(Event::RequestStart { request_id: request_id.clone() });

		let cancel = CancellationToken::new();
		let mut ctx = Context::new(ir_request);
		ctx.cancel = cancel.clone();
		let start = ctx.start_time;

		let timeout_cancel = cancel.clone();
		let timeout = self.config.request_timeout();
		let timeout_handle = tokio::spawn(async move {
			tokio::time::sleep(timeout).await;
			timeout_cancel.cancel();
		});

		let result = self.middleware.run(ctx, self.backend_call()).await;
		timeout_handle.abort();

		let mut stats = self.stats.lock();
		match &result {
			Ok(_) => {
				stats.record_success(start.elapsed().as_millis() as u64);
				drop(stats);
				self.events.emit(Event::RequestSuccess { request_id, duration_ms: start.elapsed().as_millis() as u64 });
			},
			Err(err) => {
				stats.record_failure();
				drop(stats);
				self.events.emit(Event::RequestError { request_id, code: err.code().to_string(), duration_ms: start.elapsed().as_millis() as u64 });
			},
		}

		result.map(|resp| self.frontend.from_ir(resp))
	}

	/// Same topology as `chat`, but the inner invocation is
	/// `execute_stream`; stats and the terminal `request:success`/
	/// `request:error` event fire when the `Done`/`Error` chunk is observed,
	/// not when this call returns (the stream is lazy).
	pub async fn chat_stream(&self, dialect_request: DReq, options: FromIRStreamOptions) -> Result<DialectChunkStream<DChunk>, BridgeError> {
		let ir_request = self.frontend.to_ir(dialect_request)?;
		let request_id = ir_request.metadata.request_id.clone();
		self.events.emit(Event::RequestStart { request_id: request_id.clone() });

		let cancel = CancellationToken::new();
		let mut ctx = Context::new(ir_request);
		ctx.cancel = cancel.clone();
		let start = ctx.start_time;

		let ir_stream = match self.middleware.run_stream(ctx, self.backend_stream_call()).await {
			Ok(stream) => stream,
			Err(err) => {
				self.stats.lock().record_failure();
				self.events.emit(Event::RequestError { request_id, code: err.code().to_string(), duration_ms: start.elapsed().as_millis() as u64 });
				return Err(err);
			},
		};
		let checked = checked_stream(ir_stream);
		let instrumented = self.instrument_stream(checked, request_id, start);
		Ok(self.frontend.from_ir_stream(instrumented, options))
	}

	fn instrument_stream(&self, stream: IRChunkStream, request_id: agentbridge_core::Strng, start: Instant) -> IRChunkStream {
		let events = self.events.clone();
		let stats = self.stats.clone();
		Box::pin(stream.inspect(move |chunk| match chunk {
			IRStreamChunk::Done { .. } => {
				stats.lock().record_success(start.elapsed().as_millis() as u64);
				events.emit(Event::RequestSuccess { request_id: request_id.clone(), duration_ms: start.elapsed().as_millis() as u64 });
			},
			IRStreamChunk::Error { error } => {
				stats.lock().record_failure();
				events.emit(Event::RequestError { request_id: request_id.clone(), code: error.code.clone(), duration_ms: start.elapsed().as_millis() as u64 });
			},
			_ => {},
		}))
	}
}

/// Wraps a raw backend chunk stream with [`crate::ir::StreamInvariantChecker`]
/// so a misbehaving `BackendAdapter` surfaces a loud terminal error instead
/// of corrupting a frontend's accumulation state (§3's stream invariants).
fn checked_stream(mut inner: IRChunkStream) -> IRChunkStream {
	Box::pin(async_stream::stream! {
		let mut checker = crate::ir::StreamInvariantChecker::new();
		while let Some(chunk) = inner.next().await {
			match checker.observe(&chunk) {
				Ok(()) => {
					let terminal = chunk.is_terminal();
					yield chunk;
					if terminal {
						break;
					}
				},
				Err(message) => {
					yield IRStreamChunk::error("STREAM_INVARIANT_VIOLATION", message);
					break;
				},
			}
		}
		if !checker.terminated() {
			yield IRStreamChunk::error("STREAM_ERROR", "stream ended without a terminal chunk");
		}
	})
}
