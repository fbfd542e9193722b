use agentbridge_core::strng::Strng;
use rand::seq::SliceRandom;

use crate::config::RoutingStrategy;
use crate::ir::IRChatRequest;

/// A snapshot of one candidate backend's state, enough for every selection
/// strategy to score it without the strategy module touching the Router's
/// internal registry lock directly.
#[derive(Debug, Clone)]
pub struct Candidate {
	pub name: Strng,
	pub average_cost: f64,
	pub average_latency_ms: f64,
	pub capabilities: crate::adapter::Capabilities,
}

pub struct ModelMappingEntry {
	pub pattern: regex::Regex,
	pub target: Strng,
	pub priority: i32,
}

/// Required/preferred capability flags consulted by `capability-based`
/// routing (§4.4).
#[derive(Debug, Clone, Default)]
pub struct CapabilityRequirements {
	pub require_streaming: bool,
	pub require_multi_modal: bool,
	pub require_tools: bool,
	pub min_context_tokens: Option<u64>,
}

impl CapabilityRequirements {
	fn score(&self, caps: &crate::adapter::Capabilities) -> Option<i32> {
		if self.require_streaming && !caps.streaming {
			return None;
		}
		if self.require_multi_modal && !caps.multi_modal {
			return None;
		}
		if self.require_tools && !caps.tools {
			return None;
		}
		if let Some(min) = self.min_context_tokens {
			if caps.max_context_tokens.map(|ctx| ctx < min).unwrap_or(true) {
				return None;
			}
		}
		let mut score = 0;
		if caps.multi_modal {
			score += 1;
		}
		if caps.tools {
			score += 1;
		}
		score += caps.max_context_tokens.unwrap_or(0) as i32 / 1000;
		Some(score)
	}
}

pub type CustomRouterFn = dyn Fn(&IRChatRequest, &[Candidate]) -> Option<Strng> + Send + Sync;

/// Picks one candidate out of `available` per the configured strategy. Does
/// not itself apply the default-backend/first-available fallback — the
/// Router applies that uniformly regardless of which strategy produced no
/// candidate (§4.4's "Availability" rule).
#[allow(clippy::too_many_arguments)]
pub fn select<'a>(
	strategy: RoutingStrategy,
	request: &IRChatRequest,
	available: &'a [Candidate],
	model_mapping: &[ModelMappingEntry],
	round_robin_counter: &std::sync::atomic::AtomicUsize,
	capability_requirements: Option<&CapabilityRequirements>,
	custom: Option<&CustomRouterFn>,
) -> Option<&'a Candidate> {
	if available.is_empty() {
		return None;
	}
	match strategy {
		RoutingStrategy::Explicit => {
			let preferred = request.metadata.preferred_backend()?;
			available.iter().find(|c| c.name.as_str() == preferred)
		},
		RoutingStrategy::ModelBased => {
			let model = request.model()?;
			let mut matches: Vec<&ModelMappingEntry> = model_mapping.iter().filter(|e| e.pattern.is_match(model)).collect();
			matches.sort_by(|a, b| b.priority.cmp(&a.priority));
			let target = matches.first()?.target.clone();
			available.iter().find(|c| c.name == target)
		},
		RoutingStrategy::CostOptimized => available.iter().min_by(|a, b| a.average_cost.partial_cmp(&b.average_cost).unwrap_or(std::cmp::Ordering::Equal)),
		RoutingStrategy::LatencyOptimized => available.iter().min_by(|a, b| a.average_latency_ms.partial_cmp(&b.average_latency_ms).unwrap_or(std::cmp::Ordering::Equal)),
		RoutingStrategy::RoundRobin => {
			let idx = round_robin_counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed) % available.len();
			available.get(idx)
		},
		RoutingStrategy::Random => available.choose(&mut rand::thread_rng()),
		RoutingStrategy::Custom => {
			let name = custom?(request, available)?;
			available.iter().find(|c| c.name == name)
		},
		RoutingStrategy::CapabilityBased => {
			let requirements = capability_requirements.cloned().unwrap_or_default();
			available.iter().filter_map(|c| requirements.score(&c.capabilities).map(|score| (score, c))).max_by_key(|(score, _)| *score).map(|(_, c)| c)
		},
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::AtomicUsize;

	use super::*;
	use crate::ir::{IRChatRequest, IRMetadata};

	fn candidate(name: &str) -> Candidate {
		Candidate { name: agentbridge_core::strng::new(name), average_cost: 1.0, average_latency_ms: 100.0, capabilities: crate::adapter::Capabilities::default() }
	}

	fn request() -> IRChatRequest {
		IRChatRequest::new(vec![], IRMetadata::new(agentbridge_core::strng::new("req-1")))
	}

	#[test]
	fn round_robin_cycles() {
		let candidates = vec![candidate("a"), candidate("b")];
		let counter = AtomicUsize::new(0);
		let req = request();
		let first = select(RoutingStrategy::RoundRobin, &req, &candidates, &[], &counter, None, None).unwrap();
		let second = select(RoutingStrategy::RoundRobin, &req, &candidates, &[], &counter, None, None).unwrap();
		assert_ne!(first.name, second.name);
	}

	#[test]
	fn cost_optimized_picks_cheapest() {
		let mut candidates = vec![candidate("a"), candidate("b")];
		candidates[1].average_cost = 0.1;
		let counter = AtomicUsize::new(0);
		let req = request();
		let picked = select(RoutingStrategy::CostOptimized, &req, &candidates, &[], &counter, None, None).unwrap();
		assert_eq!(picked.name.as_str(), "b");
	}

	#[test]
	fn explicit_honors_preferred_backend_metadata() {
		let candidates = vec![candidate("a"), candidate("b")];
		let counter = AtomicUsize::new(0);
		let mut req = request();
		req.metadata.custom.insert("backend".to_string(), serde_json::json!("b"));
		let picked = select(RoutingStrategy::Explicit, &req, &candidates, &[], &counter, None, None).unwrap();
		assert_eq!(picked.name.as_str(), "b");
	}
}
