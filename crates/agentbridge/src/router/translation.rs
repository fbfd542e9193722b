use std::collections::HashMap;

use agentbridge_core::strng::Strng;
use regex::Regex;

use crate::ir::{BridgeError, IRChatRequest};

/// One entry of the pattern-match tier: a compiled regex matched against the
/// requested model name, with a priority used to break ties (higher first).
pub struct ModelPattern {
	pub pattern: Regex,
	pub target: String,
	pub priority: i32,
}

/// How a translation was resolved, recorded for logging/telemetry — mirrors
/// §4.4's "default-fallback translation (configurable warn emission)" note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationSource {
	BackendExact,
	GlobalExact,
	Pattern,
	HybridDefault,
	Passthrough,
}

/// Model-name translation tables consulted after backend selection and before
/// `execute` (§4.4). Lookup order: backend-specific exact, global exact,
/// pattern (priority-sorted), hybrid default model, passthrough.
#[derive(Default)]
pub struct ModelTranslator {
	backend_exact: HashMap<Strng, HashMap<String, String>>,
	global_exact: HashMap<String, String>,
	patterns: Vec<ModelPattern>,
}

impl ModelTranslator {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_backend_map(mut self, backend: Strng, map: HashMap<String, String>) -> Self {
		self.backend_exact.insert(backend, map);
		self
	}

	pub fn with_global_map(mut self, map: HashMap<String, String>) -> Self {
		self.global_exact = map;
		self
	}

	pub fn with_pattern(mut self, pattern: Regex, target: impl Into<String>, priority: i32) -> Self {
		self.patterns.push(ModelPattern { pattern, target: target.into(), priority });
		self.patterns.sort_by(|a, b| b.priority.cmp(&a.priority));
		self
	}

	/// Resolves a translated model name for `backend`, given the strategy and
	/// the backend's declared default model (used only by `hybrid`).
	pub fn resolve(&self, backend: &Strng, model: &str, strategy: crate::config::ModelTranslationStrategy, default_model: Option<&str>) -> Option<(String, TranslationSource)> {
		use crate::config::ModelTranslationStrategy as S;
		if matches!(strategy, S::None) {
			return None;
		}

		if let Some(target) = self.backend_exact.get(backend).and_then(|m| m.get(model)) {
			return Some((target.clone(), TranslationSource::BackendExact));
		}
		if let Some(target) = self.global_exact.get(model) {
			return Some((target.clone(), TranslationSource::GlobalExact));
		}
		if matches!(strategy, S::Pattern | S::Hybrid) {
			if let Some(entry) = self.patterns.iter().find(|p| p.pattern.is_match(model)) {
				return Some((entry.target.clone(), TranslationSource::Pattern));
			}
		}
		if matches!(strategy, S::Hybrid) {
			if let Some(default_model) = default_model {
				return Some((default_model.to_string(), TranslationSource::HybridDefault));
			}
		}
		None
	}

	/// Applies translation to a shallow-cloned request, per §4.4's "replaces
	/// `parameters.model` in a shallow-cloned request". Returns the original
	/// request untouched (clone) when there's no model to translate or
	/// strategy is `none`.
	pub fn translate_request(&self, request: &IRChatRequest, backend: &Strng, strategy: crate::config::ModelTranslationStrategy, default_model: Option<&str>, strict_mode: bool, warn_on_default: bool) -> Result<IRChatRequest, BridgeError> {
		let mut translated = request.shallow_clone();
		let Some(model) = request.model() else {
			return Ok(translated);
		};
		match self.resolve(backend, model, strategy, default_model) {
			Some((target, source)) => {
				if source == TranslationSource::HybridDefault && warn_on_default {
					tracing::warn!(backend = %backend, requested_model = model, default_model = %target, "model translation fell back to backend default model");
				}
				if let Some(params) = translated.parameters.as_mut() {
					params.model = Some(target);
				}
				Ok(translated)
			},
			None => {
				if strict_mode && !matches!(strategy, crate::config::ModelTranslationStrategy::None) {
					Err(BridgeError::no_translation(model))
				} else {
					Ok(translated)
				}
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use agentbridge_core::strng;

	use super::*;
	use crate::config::ModelTranslationStrategy;
	use crate::ir::{IRChatRequest, IRMetadata, IRParameters};

	fn request_with_model(model: &str) -> IRChatRequest {
		let mut req = IRChatRequest::new(vec![], IRMetadata::new(strng::new("req-1")));
        req.parameters = Some(IRParameters { model: Some(model.to_string()), ..Default::default() });
		req
	}

	#[test]
	fn global_exact_wins_over_pattern() {
		let translator = ModelTranslator::new()
			.with_global_map(HashMap::from([("gpt-4".to_string(), "claude-3-5-sonnet".to_string())]))
			.with_pattern(Regex::new("^gpt-.*").unwrap(), "fallback-model", 10);
		let req = request_with_model("gpt-4");
		let out = translator.translate_request(&req, &strng::new("anthropic"), ModelTranslationStrategy::Exact, None, false, false).unwrap();
		assert_eq!(out.model(), Some("claude-3-5-sonnet"));
	}

	#[test]
	fn backend_specific_map_wins_over_global() {
		let translator = ModelTranslator::new()
			.with_backend_map(strng::new("anthropic"), HashMap::from([("gpt-4".to_string(), "claude-3-opus".to_string())]))
			.with_global_map(HashMap::from([("gpt-4".to_string(), "claude-3-5-sonnet".to_string())]));
		let req = request_with_model("gpt-4");
		let out = translator.translate_request(&req, &strng::new("anthropic"), ModelTranslationStrategy::Exact, None, false, false).unwrap();
		assert_eq!(out.model(), Some("claude-3-opus"));
	}

	#[test]
	fn hybrid_falls_back_to_default_model() {
		let translator = ModelTranslator::new();
		let req = request_with_model("unknown-model");
		let out = translator.translate_request(&req, &strng::new("anthropic"), ModelTranslationStrategy::Hybrid, Some("claude-3-5-sonnet"), false, false).unwrap();
		assert_eq!(out.model(), Some("claude-3-5-sonnet"));
	}

	#[test]
	fn strict_mode_fails_without_translation() {
		let translator = ModelTranslator::new();
		let req = request_with_model("unknown-model");
		let err = translator.translate_request(&req, &strng::new("anthropic"), ModelTranslationStrategy::Exact, None, true, false).unwrap_err();
		assert_eq!(err.code(), "ROUTING_FAILED");
	}
}
