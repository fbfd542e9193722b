use agentbridge_core::strng::Strng;
use parking_lot::RwLock;

/// Events the Bridge (and, optionally, middlewares) emit over the course of
/// a request's lifetime. Listeners are plain closures, not an async
/// pub/sub bus — grounded on the teacher's preference for direct callback
/// registration over a full event-bus dependency.
#[derive(Debug, Clone)]
pub enum Event {
	RequestStart { request_id: Strng },
	RequestSuccess { request_id: Strng, duration_ms: u64 },
	RequestError { request_id: Strng, code: String, duration_ms: u64 },
	BackendFailover { request_id: Strng, from: Strng, to: Strng, reason: String },
}

impl Event {
	pub fn kind(&self) -> &'static str {
		match self {
			Event::RequestStart { .. } => "request:start",
			Event::RequestSuccess { .. } => "request:success",
			Event::RequestError { .. } => "request:error",
			Event::BackendFailover { .. } => "backend:failover",
		}
	}
}

type Listener = Box<dyn Fn(&Event) + Send + Sync>;

/// Registers listeners by event kind and fans out synchronously. Listener
/// storage is a `parking_lot::RwLock`-guarded `Vec`, never held across an
/// `.await` — `emit` itself is synchronous by design, since listeners are
/// expected to be cheap (metrics increments, log lines); anything
/// long-running should hand off to its own task.
#[derive(Default)]
pub struct EventEmitter {
	listeners: RwLock<Vec<(&'static str, Listener)>>,
}

impl EventEmitter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn on(&self, kind: &'static str, listener: impl Fn(&Event) + Send + Sync + 'static) {
		self.listeners.write().push((kind, Box::new(listener)));
	}

	pub fn emit(&self, event: Event) {
		let kind = event.kind();
		for (registered_kind, listener) in self.listeners.read().iter() {
			if *registered_kind == kind {
				listener(&event);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	use super::*;

	#[test]
	fn emits_only_to_matching_kind() {
		let emitter = EventEmitter::new();
		let success_count = Arc::new(AtomicUsize::new(0));
		let error_count = Arc::new(AtomicUsize::new(0));
		let sc = success_count.clone();
		emitter.on("request:success", move |_| {
			sc.fetch_add(1, Ordering::SeqCst);
		});
		let ec = error_count.clone();
		emitter.on("request:error", move |_| {
			ec.fetch_add(1, Ordering::SeqCst);
		});

		emitter.emit(Event::RequestSuccess { request_id: agentbridge_core::ids::request_id(), duration_ms: 10 });

		assert_eq!(success_count.load(Ordering::SeqCst), 1);
		assert_eq!(error_count.load(Ordering::SeqCst), 0);
	}
}
