//! The Router (§4.4): a `BackendAdapter`-shaped composite over a registry of
//! child backends, with selection strategy, model-name translation,
//! sequential/parallel/custom fallback, a per-backend circuit breaker, and
//! parallel dispatch. Grounded on the teacher's `llm::Router`-shaped
//! multi-provider dispatch (`crates/agentgateway/src/llm/mod.rs`'s provider
//! selection) generalized from a fixed provider enum to a registry of
//! `Arc<dyn BackendAdapter>` looked up by name, the way this crate's
//! `FrontendAdapter`/`BackendAdapter` split already generalizes the
//! teacher's per-provider `Provider` structs.

pub mod circuit;
pub mod strategy;
pub mod translation;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use agentbridge_core::strng::Strng;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

pub use circuit::{CircuitBreaker, CircuitState};
pub use strategy::{Candidate, CapabilityRequirements, CustomRouterFn, ModelMappingEntry};
pub use translation::{ModelTranslator, TranslationSource};

use crate::adapter::{AdapterMetadata, BackendAdapter, Capabilities, IRChunkStream, ListModelsOptions, ListModelsResult, ModelInfo};
use crate::config::{FallbackStrategy, RouterConfig};
use crate::events::{Event, EventEmitter};
use crate::ir::{BridgeError, IRChatRequest, IRChatResponse, IRStreamChunk, Provenance, ProvenancedError};
use crate::stats::{Counters, StatsSnapshot};

/// Per-backend runtime state the Router owns exclusively (§4.4); child
/// adapters never hold a reference back to it.
pub struct BackendState {
	pub adapter: Arc<dyn BackendAdapter>,
	pub is_healthy: bool,
	pub last_health_check: Option<Instant>,
	pub circuit: CircuitBreaker,
	pub counters: Counters,
	pub default_model: Option<String>,
	models_cache: Option<(Instant, Vec<ModelInfo>)>,
}

impl BackendState {
	fn new(adapter: Arc<dyn BackendAdapter>, config: &RouterConfig, default_model: Option<String>) -> Self {
		Self {
			adapter,
			is_healthy: true,
			last_health_check: None,
			circuit: CircuitBreaker::new(config.circuit_breaker_threshold, config.circuit_breaker_timeout()),
			counters: Counters::new(),
			default_model,
			models_cache: None,
		}
	}

	/// A backend is available iff healthy and its circuit isn't open (§4.4).
	/// Calling this can itself flip `Open` to `HalfOpen` once the cooldown
	/// has elapsed — the circuit breaker's `allow()` is the single source of
	/// truth for that transition.
	fn is_available(&mut self, enable_circuit_breaker: bool) -> bool {
		self.is_healthy && (!enable_circuit_breaker || self.circuit.allow())
	}
}

/// A serializable snapshot returned by `get_backend_info`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BackendInfo {
	pub name: String,
	pub is_healthy: bool,
	pub circuit_state: CircuitState,
	pub consecutive_failures: u32,
	pub stats: StatsSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelStrategy {
	First,
	All,
	Fastest,
	Custom,
}

#[derive(Debug, Clone)]
pub struct ParallelDispatchOptions {
	pub strategy: ParallelStrategy,
	pub timeout: Option<Duration>,
	pub cancel_on_first_success: bool,
}

impl Default for ParallelDispatchOptions {
	fn default() -> Self {
		Self { strategy: ParallelStrategy::First, timeout: None, cancel_on_first_success: true }
	}
}

#[derive(Debug, Clone)]
pub struct ParallelEntry {
	pub backend: Strng,
	pub success: bool,
	pub response: Option<IRChatResponse>,
	pub error: Option<BridgeError>,
	pub latency_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ParallelDispatchResult {
	pub entries: Vec<ParallelEntry>,
	pub successful_backends: Vec<Strng>,
}

type CustomFallbackFn = dyn Fn(&IRChatRequest, &[Strng]) -> Option<Strng> + Send + Sync;

/// The Router itself. `register`/`unregister` enforce name uniqueness and
/// protect the default/last backend (§4.4's "Registration and invariants").
pub struct Router {
	order: RwLock<Vec<Strng>>,
	backends: RwLock<HashMap<Strng, BackendState>>,
	default_backend: RwLock<Option<Strng>>,
	fallback_chain: RwLock<Vec<Strng>>,
	round_robin_counter: AtomicUsize,
	config: RwLock<RouterConfig>,
	translator: RwLock<ModelTranslator>,
	model_mapping: RwLock<Vec<ModelMappingEntry>>,
	capability_requirements: RwLock<Option<CapabilityRequirements>>,
	custom_router: RwLock<Option<Box<CustomRouterFn>>>,
	custom_fallback: RwLock<Option<Box<CustomFallbackFn>>>,
	events: Arc<EventEmitter>,
	total_fallbacks: AtomicUsize,
	metadata: AdapterMetadata,
}

impl Router {
	pub fn new(config: RouterConfig) -> Self {
		let metadata = AdapterMetadata {
			name: Strng::from("router"),
			version: Strng::from("1.0.0"),
			provider: Strng::from("router"),
			capabilities: Capabilities { max_context_tokens: None, ..Capabilities::default() },
			config: serde_json::Value::Null,
		};
		Self {
			order: RwLock::new(Vec::new()),
			backends: RwLock::new(HashMap::new()),
			default_backend: RwLock::new(config.default_backend.as_deref().map(Strng::from)),
			fallback_chain: RwLock::new(Vec::new()),
			round_robin_counter: AtomicUsize::new(0),
			translator: RwLock::new(ModelTranslator::new()),
			model_mapping: RwLock::new(Vec::new()),
			capability_requirements: RwLock::new(None),
			custom_router: RwLock::new(None),
			custom_fallback: RwLock::new(None),
			events: Arc::new(EventEmitter::new()),
			total_fallbacks: AtomicUsize::new(0),
			config: RwLock::new(config),
			metadata,
		}
	}

	pub fn on(&self, kind: &'static str, listener: impl Fn(&Event) + Send + Sync + 'static) {
		self.events.on(kind, listener);
	}

	pub fn total_fallbacks(&self) -> usize {
		self.total_fallbacks.load(Ordering::Relaxed)
	}

	pub fn set_model_translator(&self, translator: ModelTranslator) {
		*self.translator.write() = translator;
	}

	pub fn set_model_mapping(&self, mapping: Vec<ModelMappingEntry>) {
		*self.model_mapping.write() = mapping;
	}

	pub fn set_fallback_chain(&self, chain: Vec<Strng>) {
		*self.fallback_chain.write() = chain;
	}

	pub fn set_capability_requirements(&self, requirements: CapabilityRequirements) {
		*self.capability_requirements.write() = Some(requirements);
	}

	pub fn set_custom_router(&self, f: impl Fn(&IRChatRequest, &[Candidate]) -> Option<Strng> + Send + Sync + 'static) {
		*self.custom_router.write() = Some(Box::new(f));
	}

	pub fn set_custom_fallback(&self, f: impl Fn(&IRChatRequest, &[Strng]) -> Option<Strng> + Send + Sync + 'static) {
		*self.custom_fallback.write() = Some(Box::new(f));
	}

	pub fn register(&self, name: Strng, adapter: Arc<dyn BackendAdapter>, default_model: Option<String>) -> Result<(), BridgeError> {
		let mut backends = self.backends.write();
		if backends.contains_key(&name) {
			return Err(BridgeError::Routing { message: format!("backend '{name}' is already registered") });
		}
		let config = self.config.read().clone();
		backends.insert(name.clone(), BackendState::new(adapter, &config, default_model));
		self.order.write().push(name.clone());
		if self.default_backend.read().is_none() {
			*self.default_backend.write() = Some(name);
		}
		Ok(())
	}

	pub fn unregister(&self, name: &Strng) -> Result<(), BridgeError> {
		let mut backends = self.backends.write();
		if !backends.contains_key(name) {
			return Err(BridgeError::Routing { message: format!("backend '{name}' is not registered") });
		}
		if backends.len() == 1 {
			return Err(BridgeError::Routing { message: "cannot unregister the last remaining backend".to_string() });
		}
		if self.default_backend.read().as_ref() == Some(name) {
			return Err(BridgeError::Routing { message: "cannot unregister the default backend".to_string() });
		}
		backends.remove(name);
		self.order.write().retain(|n| n != name);
		Ok(())
	}

	pub fn get(&self, name: &Strng) -> Option<Arc<dyn BackendAdapter>> {
		self.backends.read().get(name).map(|s| s.adapter.clone())
	}

	pub fn has(&self, name: &Strng) -> bool {
		self.backends.read().contains_key(name)
	}

	pub fn list_backends(&self) -> Vec<Strng> {
		self.order.read().clone()
	}

	pub fn get_backend_info(&self, name: &Strng) -> Option<BackendInfo> {
		let backends = self.backends.read();
		let state = backends.get(name)?;
		Some(BackendInfo {
			name: name.to_string(),
			is_healthy: state.is_healthy,
			circuit_state: state.circuit.state(),
			consecutive_failures: state.circuit.consecutive_failures(),
			stats: StatsSnapshot::from(&state.counters),
		})
	}

	fn available_candidates(&self) -> Vec<Candidate> {
		let config = self.config.read();
		let order = self.order.read();
		let mut backends = self.backends.write();
		order
			.iter()
			.filter_map(|name| {
				let state = backends.get_mut(name)?;
				if !state.is_available(config.enable_circuit_breaker) {
					return None;
				}
				Some(Candidate { name: name.clone(), average_cost: if state.counters.total_requests > 0 { state.counters.total_cost / state.counters.total_requests as f64 } else { 0.0 }, average_latency_ms: state.counters.average_latency_ms(), capabilities: state.adapter.metadata().capabilities.clone() })
			})
			.collect()
	}

	/// Distinguishes "nothing registered" from "registered but every remaining
	/// candidate's circuit is open" (§8 invariant 5: the latter raises
	/// `PROVIDER_UNAVAILABLE` without ever invoking the backend's adapter).
	fn no_candidate_error(&self, excluding: &[Strng]) -> BridgeError {
		let order = self.order.read();
		let remaining: Vec<&Strng> = order.iter().filter(|n| !excluding.contains(n)).collect();
		if remaining.is_empty() {
			return BridgeError::NoBackendAvailable;
		}
		let backends = self.backends.read();
		let all_circuit_open = remaining.iter().all(|name| backends.get(*name).map(|s| s.is_healthy && s.circuit.state() == CircuitState::Open).unwrap_or(false));
		if all_circuit_open {
			return BridgeError::provider_unavailable(remaining[0]);
		}
		BridgeError::NoBackendAvailable
	}

	/// Selects a backend for `request`, applying the configured strategy and
	/// then the default-backend/first-available fallback rule (§4.4).
	fn select_backend(&self, request: &IRChatRequest, excluding: &[Strng]) -> Result<Strng, BridgeError> {
		let mut candidates = self.available_candidates();
		candidates.retain(|c| !excluding.contains(&c.name));
		if candidates.is_empty() {
			return Err(self.no_candidate_error(excluding));
		}

		let strategy = self.config.read().routing_strategy;
		let mapping = self.model_mapping.read();
		let requirements = self.capability_requirements.read();
		let custom = self.custom_router.read();
		let picked = strategy::select(strategy, request, &candidates, &mapping, &self.round_robin_counter, requirements.as_ref(), custom.as_deref());

		if let Some(candidate) = picked {
			return Ok(candidate.name.clone());
		}

		if let Some(default) = self.default_backend.read().as_ref() {
			if candidates.iter().any(|c| &c.name == default) {
				return Ok(default.clone());
			}
		}
		candidates.first().map(|c| c.name.clone()).ok_or(BridgeError::NoBackendAvailable)
	}

	fn translate_for(&self, backend: &Strng, request: &IRChatRequest) -> Result<IRChatRequest, BridgeError> {
		let config = self.config.read();
		let default_model = self.backends.read().get(backend).and_then(|s| s.default_model.clone());
		self.translator.read().translate_request(request, backend, config.model_translation.strategy, default_model.as_deref(), config.model_translation.strict_mode, config.model_translation.warn_on_default)
	}

	async fn execute_on(&self, backend: &Strng, request: IRChatRequest, cancel: CancellationToken) -> Result<IRChatResponse, BridgeError> {
		let adapter = self.get(backend).ok_or_else(|| BridgeError::Routing { message: format!("backend '{backend}' vanished from the registry mid-request") })?;
		let track_cost = self.config.read().track_cost;
		let cost_estimate = if track_cost { adapter.estimate_cost(&request) } else { None };
		let start = Instant::now();
		let result = adapter.execute(request, cancel).await;
		let latency_ms = start.elapsed().as_millis() as u64;
		let mut backends = self.backends.write();
		if let Some(state) = backends.get_mut(backend) {
			match &result {
				Ok(_) => {
					state.counters.record_success(latency_ms);
					state.circuit.record_success();
					if let Some(cost) = cost_estimate {
						state.counters.total_cost += cost;
					}
				},
				Err(_) => {
					state.counters.record_failure();
					state.circuit.record_failure();
				},
			}
		}
		result
	}

	async fn execute_with_fallback(&self, request: IRChatRequest, cancel: CancellationToken) -> Result<IRChatResponse, BridgeError> {
		let primary = self.select_backend(&request, &[])?;
		let translated = self.translate_for(&primary, &request)?;
		match self.execute_on(&primary, translated, cancel.clone()).await {
			Ok(response) => Ok(response),
			Err(primary_err) => self.fall_back(request, primary, primary_err, cancel).await,
		}
	}

	async fn fall_back(&self, request: IRChatRequest, primary: Strng, primary_err: BridgeError, cancel: CancellationToken) -> Result<IRChatResponse, BridgeError> {
		let strategy = self.config.read().fallback_strategy;
		match strategy {
			FallbackStrategy::None => Err(primary_err),
			FallbackStrategy::Sequential => {
				let mut attempted = vec![primary.clone()];
				let chain: Vec<Strng> = self.fallback_chain.read().iter().filter(|n| !attempted.contains(n)).cloned().collect();
				for candidate in chain {
					if !self.has(&candidate) || attempted.contains(&candidate) {
						continue;
					}
					attempted.push(candidate.clone());
					let available = self.available_candidates();
					if !available.iter().any(|c| c.name == candidate) {
						continue;
					}
					let translated = match self.translate_for(&candidate, &request) {
						Ok(t) => t,
						Err(_) => continue,
					};
					if let Ok(response) = self.execute_on(&candidate, translated, cancel.clone()).await {
						self.total_fallbacks.fetch_add(1, Ordering::Relaxed);
						self.events.emit(Event::BackendFailover { request_id: request.metadata.request_id.clone(), from: primary.clone(), to: candidate, reason: primary_err.code().to_string() });
						return Ok(response);
					}
				}
				Err(all_backends_failed(primary_err, &primary))
			},
			FallbackStrategy::Parallel => {
				let remaining: Vec<Strng> = self.available_candidates().into_iter().map(|c| c.name).filter(|n| n != &primary).collect();
				let result = self.dispatch_parallel(request.clone(), remaining, ParallelDispatchOptions { strategy: ParallelStrategy::First, timeout: None, cancel_on_first_success: true }, cancel).await?;
				match result.entries.into_iter().find(|e| e.success) {
					Some(entry) => {
						self.total_fallbacks.fetch_add(1, Ordering::Relaxed);
						self.events.emit(Event::BackendFailover { request_id: request.metadata.request_id.clone(), from: primary, to: entry.backend, reason: primary_err.code().to_string() });
						Ok(entry.response.expect("success entry carries a response"))
					},
					None => Err(all_backends_failed(primary_err, &primary)),
				}
			},
			FallbackStrategy::Custom => {
				let mut attempted = vec![primary.clone()];
				loop {
					let next = {
						let custom = self.custom_fallback.read();
						match custom.as_ref() {
							Some(f) => f(&request, &attempted),
							None => None,
						}
					};
					let Some(candidate) = next else {
						return Err(all_backends_failed(primary_err, &primary));
					};
					attempted.push(candidate.clone());
					let translated = match self.translate_for(&candidate, &request) {
						Ok(t) => t,
						Err(_) => continue,
					};
					if let Ok(response) = self.execute_on(&candidate, translated, cancel.clone()).await {
						self.total_fallbacks.fetch_add(1, Ordering::Relaxed);
						self.events.emit(Event::BackendFailover { request_id: request.metadata.request_id.clone(), from: primary, to: candidate, reason: primary_err.code().to_string() });
						return Ok(response);
					}
				}
			},
		}
	}

	/// Fans `request` out to `targets` concurrently (§4.4's `dispatchParallel`).
	/// `first` cancels siblings as soon as one succeeds when
	/// `cancel_on_first_success` is set; `all`/`fastest` wait out every entry
	/// and let the caller pick.
	pub async fn dispatch_parallel(&self, request: IRChatRequest, targets: Vec<Strng>, options: ParallelDispatchOptions, cancel: CancellationToken) -> Result<ParallelDispatchResult, BridgeError> {
		let mut futures = FuturesUnordered::new();
		for backend in targets {
			let request = request.shallow_clone();
			let translated = self.translate_for(&backend, &request);
			let child_cancel = cancel.child_token();
			futures.push(async move {
				let start = Instant::now();
				let result = match translated {
					Ok(translated) => self.execute_on(&backend, translated, child_cancel).await,
					Err(err) => Err(err),
				};
				let latency_ms = start.elapsed().as_millis() as u64;
				(backend, result, latency_ms)
			});
		}

		let deadline = options.timeout.map(|d| tokio::time::Instant::now() + d);
		let mut entries = Vec::new();
		let mut successful_backends = Vec::new();
		while let Some((backend, result, latency_ms)) = {
			match deadline {
				Some(deadline) => match tokio::time::timeout_at(deadline, futures.next()).await {
					Ok(item) => item,
					Err(_) => None,
				},
				None => futures.next().await,
			}
		} {
			let success = result.is_ok();
			if success {
				successful_backends.push(backend.clone());
			}
			entries.push(ParallelEntry { backend, success, response: result.as_ref().ok().cloned(), error: result.err(), latency_ms });
			if success && options.strategy == ParallelStrategy::First && options.cancel_on_first_success {
				cancel.cancel();
				break;
			}
		}

		if entries.iter().all(|e| !e.success) && !entries.is_empty() {
			let first = entries.into_iter().find(|e| e.error.is_some()).expect("all entries failed, so at least one carries an error");
			let backend = first.backend.clone();
			return Err(all_backends_failed(first.error.unwrap_or(BridgeError::NoBackendAvailable), &backend));
		}
		Ok(ParallelDispatchResult { entries, successful_backends })
	}

	/// Runs each registered backend's own `health_check()` and updates
	/// `is_healthy`/`last_health_check` (§4.4's "Health"). A panicking or
	/// erroring health check classifies the backend as unhealthy.
	pub async fn check_health(&self) {
		let names = self.order.read().clone();
		for name in names {
			let adapter = self.get(&name);
			let Some(adapter) = adapter else { continue };
			let healthy = adapter.health_check().await;
			if let Some(state) = self.backends.write().get_mut(&name) {
				state.is_healthy = healthy;
				state.last_health_check = Some(Instant::now());
			}
		}
	}

	pub async fn check_health_one(&self, name: &Strng) -> Result<bool, BridgeError> {
		let adapter = self.get(name).ok_or_else(|| BridgeError::Routing { message: format!("backend '{name}' is not registered") })?;
		let healthy = adapter.health_check().await;
		if let Some(state) = self.backends.write().get_mut(name) {
			state.is_healthy = healthy;
			state.last_health_check = Some(Instant::now());
		}
		Ok(healthy)
	}

	/// Spawns a background task that calls [`Router::check_health`] on
	/// `healthCheckIntervalMs`, the way the teacher's `caclient` runs its
	/// certificate-renewal loop on a `tokio::time::interval` (§4.4's "Optional
	/// periodic `checkHealth()`"). A `health_check_interval_ms` of `0` disables
	/// this (matches the documented knob semantics: 0 means "caller-driven
	/// only"). Returns `None` in that case. Takes `Arc<Self>` by value — pass
	/// a clone (`router.clone().spawn_health_check_task()`) to keep using the
	/// original; drop the returned handle to detach, or abort it to stop.
	pub fn spawn_health_check_task(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
		let interval_ms = self.config.read().health_check_interval_ms;
		if interval_ms == 0 {
			return None;
		}
		Some(tokio::spawn(async move {
			let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
			interval.tick().await; // first tick fires immediately; skip it, registration already assumes healthy
			loop {
				interval.tick().await;
				self.check_health().await;
			}
		}))
	}
}

#[async_trait::async_trait]
impl BackendAdapter for Router {
	fn metadata(&self) -> &AdapterMetadata {
		&self.metadata
	}

	async fn execute(&self, request: IRChatRequest, cancel: CancellationToken) -> Result<IRChatResponse, BridgeError> {
		self.execute_with_fallback(request, cancel).await
	}

	/// Never falls over mid-stream: a primary failure (at setup or while
	/// iterating) surfaces as a single terminal `Error` chunk rather than
	/// silently retrying on another backend, since already-emitted tokens
	/// can't be withdrawn (§4.4).
	async fn execute_stream(&self, request: IRChatRequest, cancel: CancellationToken) -> Result<IRChunkStream, BridgeError> {
		let primary = match self.select_backend(&request, &[]) {
			Ok(name) => name,
			Err(err) => return Ok(single_error_stream(err)),
		};
		let translated = match self.translate_for(&primary, &request) {
			Ok(t) => t,
			Err(err) => return Ok(single_error_stream(err)),
		};
		let adapter = match self.get(&primary) {
			Some(a) => a,
			None => return Ok(single_error_stream(BridgeError::NoBackendAvailable)),
		};
		match adapter.execute_stream(translated, cancel).await {
			Ok(stream) => Ok(stream),
			Err(err) => {
				if let Some(state) = self.backends.write().get_mut(&primary) {
					state.counters.record_failure();
					state.circuit.record_failure();
				}
				Ok(single_error_stream(err))
			},
		}
	}

	async fn health_check(&self) -> bool {
		self.backends.read().values().any(|s| s.is_healthy)
	}

	fn estimate_cost(&self, request: &IRChatRequest) -> Option<f64> {
		let backend = self.select_backend(request, &[]).ok()?;
		self.get(&backend)?.estimate_cost(request)
	}

	/// Memoized per backend behind `capability_cache_duration` (§4.4's
	/// cacheable `list_models`), aggregated across every registered backend.
	async fn list_models(&self, options: ListModelsOptions) -> Result<ListModelsResult, BridgeError> {
		let names = self.order.read().clone();
		let ttl = self.config.read().capability_cache_duration();
		let refresh = options.refresh.unwrap_or(false);
		let mut aggregated = Vec::new();
		for name in names {
			let cached = { self.backends.read().get(&name).and_then(|s| s.models_cache.clone()) };
			let fresh = cached.as_ref().map(|(fetched_at, _)| fetched_at.elapsed() < ttl).unwrap_or(false);
			let models = if fresh && !refresh {
				cached.unwrap().1
			} else {
				let Some(adapter) = self.get(&name) else { continue };
				let result = adapter.list_models(ListModelsOptions::default()).await?;
				if let Some(state) = self.backends.write().get_mut(&name) {
					state.models_cache = Some((Instant::now(), result.models.clone()));
				}
				result.models
			};
			aggregated.extend(models);
		}
		Ok(ListModelsResult { models: aggregated, provider: Strng::from("router") })
	}

	async fn dispose(&self) {
		let names = self.order.read().clone();
		for name in names {
			if let Some(adapter) = self.get(&name) {
				adapter.dispose().await;
			}
		}
	}
}

/// Wraps the first primary error seen during fallback with the backend it
/// came from, so callers inspecting `AllBackendsFailed` can tell which
/// backend's failure triggered the chain rather than just seeing the last.
fn all_backends_failed(primary_err: BridgeError, primary: &Strng) -> BridgeError {
	BridgeError::AllBackendsFailed(Box::new(ProvenancedError { error: primary_err, provenance: Provenance { backend: Some(primary.clone()), ..Default::default() } }))
}

fn single_error_stream(error: BridgeError) -> IRChunkStream {
	Box::pin(futures::stream::once(async move { IRStreamChunk::error(error.code(), error.to_string()) }))
}

#[cfg(test)]
mod tests {
	use async_trait::async_trait;

	use super::*;
	use crate::ir::{IRMessage, IRMetadata};

	struct StubBackend {
		metadata: AdapterMetadata,
		fail: bool,
		calls: AtomicUsize,
	}

	impl StubBackend {
		fn new(name: &str, fail: bool) -> Self {
			Self { metadata: AdapterMetadata { name: Strng::from(name.to_string()), version: Strng::from("1.0.0"), provider: Strng::from(name.to_string()), capabilities: Capabilities::default(), config: serde_json::Value::Null }, fail, calls: AtomicUsize::new(0) }
		}
	}

	#[async_trait]
	impl BackendAdapter for StubBackend {
		fn metadata(&self) -> &AdapterMetadata {
			&self.metadata
		}

		async fn execute(&self, request: IRChatRequest, _cancel: CancellationToken) -> Result<IRChatResponse, BridgeError> {
			self.calls.fetch_add(1, Ordering::Relaxed);
			if self.fail {
				return Err(BridgeError::Provider { message: "stub failure".to_string(), retryable: true });
			}
			Ok(IRChatResponse { message: IRMessage::assistant("ok"), finish_reason: crate::ir::FinishReason::Stop, usage: None, metadata: request.metadata, raw: None })
		}

		async fn execute_stream(&self, _request: IRChatRequest, _cancel: CancellationToken) -> Result<IRChunkStream, BridgeError> {
			Err(BridgeError::Provider { message: "not used in this test".to_string(), retryable: false })
		}
	}

	fn request() -> IRChatRequest {
		IRChatRequest::new(vec![IRMessage::user("hi")], IRMetadata::new(agentbridge_core::strng::new("req-1")))
	}

	#[tokio::test]
	async fn sequential_fallback_succeeds_on_second_backend() {
		let mut config = RouterConfig::default();
		config.fallback_strategy = FallbackStrategy::Sequential;
		let router = Router::new(config);
		router.register(Strng::from("a"), Arc::new(StubBackend::new("a", true)), None).unwrap();
		router.register(Strng::from("b"), Arc::new(StubBackend::new("b", false)), None).unwrap();
		router.set_fallback_chain(vec![Strng::from("b")]);

		let response = router.execute(request(), CancellationToken::new()).await.unwrap();
		assert_eq!(response.message.content.as_text(), "ok");
		assert_eq!(router.total_fallbacks(), 1);
	}

	#[tokio::test]
	async fn no_fallback_surfaces_primary_error() {
		let mut config = RouterConfig::default();
		config.fallback_strategy = FallbackStrategy::None;
		let router = Router::new(config);
		router.register(Strng::from("a"), Arc::new(StubBackend::new("a", true)), None).unwrap();

		let err = router.execute(request(), CancellationToken::new()).await.unwrap_err();
		assert_eq!(err.code(), "PROVIDER_ERROR");
	}

	#[tokio::test]
	async fn cannot_unregister_last_backend() {
		let router = Router::new(RouterConfig::default());
		router.register(Strng::from("a"), Arc::new(StubBackend::new("a", false)), None).unwrap();
		let err = router.unregister(&Strng::from("a")).unwrap_err();
		assert_eq!(err.code(), "ROUTING_FAILED");
	}

	#[tokio::test]
	async fn circuit_opens_after_repeated_failures() {
		let mut config = RouterConfig::default();
		config.circuit_breaker_threshold = 2;
		config.fallback_strategy = FallbackStrategy::None;
		let router = Router::new(config);
		router.register(Strng::from("a"), Arc::new(StubBackend::new("a", true)), None).unwrap();

		for _ in 0..2 {
			let _ = router.execute(request(), CancellationToken::new()).await;
		}
		let info = router.get_backend_info(&Strng::from("a")).unwrap();
		assert_eq!(info.circuit_state, CircuitState::Open);
	}

	#[tokio::test]
	async fn open_circuit_rejects_without_invoking_the_adapter() {
		let mut config = RouterConfig::default();
		config.circuit_breaker_threshold = 2;
		config.fallback_strategy = FallbackStrategy::None;
		let router = Router::new(config);
		let backend = Arc::new(StubBackend::new("a", true));
		router.register(Strng::from("a"), backend.clone(), None).unwrap();

		for _ in 0..2 {
			let _ = router.execute(request(), CancellationToken::new()).await;
		}
		assert_eq!(backend.calls.load(Ordering::Relaxed), 2);

		let err = router.execute(request(), CancellationToken::new()).await.unwrap_err();
		assert_eq!(err.code(), "PROVIDER_UNAVAILABLE");
		assert_eq!(backend.calls.load(Ordering::Relaxed), 2);
	}

	#[tokio::test]
	async fn health_check_task_runs_on_the_configured_interval() {
		let mut config = RouterConfig::default();
		config.health_check_interval_ms = 20;
		let router = Arc::new(Router::new(config));
		router.register(Strng::from("a"), Arc::new(StubBackend::new("a", false)), None).unwrap();
		assert!(router.get_backend_info(&Strng::from("a")).unwrap().stats.total_requests == 0);

		let handle = router.clone().spawn_health_check_task().expect("non-zero interval spawns a task");
		tokio::time::sleep(Duration::from_millis(60)).await;
		handle.abort();

		let backends = router.backends.read();
		assert!(backends.get(&Strng::from("a")).unwrap().last_health_check.is_some());
	}

	#[test]
	fn zero_interval_disables_the_health_check_task() {
		let mut config = RouterConfig::default();
		config.health_check_interval_ms = 0;
		let router = Arc::new(Router::new(config));
		assert!(router.spawn_health_check_task().is_none());
	}
}
