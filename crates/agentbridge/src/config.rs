use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `Bridge` configuration. Loadable from YAML/JSON via `serde_yaml`/
/// `serde_json` — no hot-reload or file-watching (that's control-plane
/// machinery the teacher's xDS layer owns, explicitly out of scope here).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
	pub request_timeout_ms: u64,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self { request_timeout_ms: 60_000 }
	}
}

impl BridgeConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_millis(self.request_timeout_ms)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
	Explicit,
	ModelBased,
	CostOptimized,
	LatencyOptimized,
	RoundRobin,
	Random,
	Custom,
	CapabilityBased,
}

impl Default for RoutingStrategy {
	fn default() -> Self {
		RoutingStrategy::RoundRobin
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackStrategy {
	None,
	Sequential,
	Parallel,
	Custom,
}

impl Default for FallbackStrategy {
	fn default() -> Self {
		FallbackStrategy::None
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelTranslationStrategy {
	None,
	Exact,
	Pattern,
	Hybrid,
}

impl Default for ModelTranslationStrategy {
	fn default() -> Self {
		ModelTranslationStrategy::None
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelTranslationConfig {
	pub strategy: ModelTranslationStrategy,
	pub warn_on_default: bool,
	pub strict_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationGoal {
	Balanced,
	Cost,
	Latency,
	Quality,
}

impl Default for OptimizationGoal {
	fn default() -> Self {
		OptimizationGoal::Balanced
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptimizationWeights {
	pub cost: f64,
	pub latency: f64,
	pub quality: f64,
}

/// `Router` configuration (§4.4's "Configuration knobs", full recognized set).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouterConfig {
	pub routing_strategy: RoutingStrategy,
	pub fallback_strategy: FallbackStrategy,
	pub default_backend: Option<String>,
	/// Interval for `Router::spawn_health_check_task`'s background loop.
	/// `0` disables periodic checks entirely; callers then drive
	/// `check_health`/`check_health_one` themselves.
	pub health_check_interval_ms: u64,
	pub enable_circuit_breaker: bool,
	pub circuit_breaker_threshold: u32,
	pub circuit_breaker_timeout_ms: u64,
	pub track_latency: bool,
	pub track_cost: bool,
	pub capability_based_routing: bool,
	pub optimization: OptimizationGoal,
	pub optimization_weights: OptimizationWeights,
	pub capability_cache_duration_ms: u64,
	pub model_translation: ModelTranslationConfig,
}

impl Default for RouterConfig {
	fn default() -> Self {
		Self {
			routing_strategy: RoutingStrategy::default(),
			fallback_strategy: FallbackStrategy::default(),
			default_backend: None,
			health_check_interval_ms: 30_000,
			enable_circuit_breaker: true,
			circuit_breaker_threshold: 5,
			circuit_breaker_timeout_ms: 60_000,
			track_latency: true,
			track_cost: false,
			capability_based_routing: false,
			optimization: OptimizationGoal::default(),
			optimization_weights: OptimizationWeights::default(),
			capability_cache_duration_ms: 300_000,
			model_translation: ModelTranslationConfig::default(),
		}
	}
}

impl RouterConfig {
	pub fn circuit_breaker_timeout(&self) -> Duration {
		Duration::from_millis(self.circuit_breaker_timeout_ms)
	}

	pub fn capability_cache_duration(&self) -> Duration {
		Duration::from_millis(self.capability_cache_duration_ms)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_config_round_trips_through_yaml() {
		let config = RouterConfig::default();
		let yaml = serde_yaml::to_string(&config).unwrap();
		let parsed: RouterConfig = serde_yaml::from_str(&yaml).unwrap();
		assert_eq!(parsed.circuit_breaker_threshold, config.circuit_breaker_threshold);
	}

	#[test]
	fn partial_yaml_uses_field_defaults() {
		let parsed: RouterConfig = serde_yaml::from_str("routingStrategy: cost-optimized\n").unwrap();
		assert_eq!(parsed.routing_strategy, RoutingStrategy::CostOptimized);
		assert_eq!(parsed.circuit_breaker_threshold, 5);
	}
}
