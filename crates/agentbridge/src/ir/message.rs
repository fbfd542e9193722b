use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical role vocabulary. Dialect aliases (`bot`, `ai`, `model`, `human`, ...)
/// are mapped onto this set by each frontend adapter's `to_ir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	System,
	User,
	Assistant,
}

impl Role {
	/// Maps a dialect's free-text role name onto the canonical vocabulary.
	/// Unknown roles fall back to `User` — the safest default for a turn whose
	/// author we can't otherwise classify.
	pub fn normalize(raw: &str) -> Role {
		match raw.to_ascii_lowercase().as_str() {
			"system" | "developer" => Role::System,
			"assistant" | "bot" | "ai" | "model" => Role::Assistant,
			_ => Role::User,
		}
	}
}

/// One block of message content. A message's content is either a single text
/// string (the common case) or an ordered sequence of these blocks for
/// multimodal/tool-bearing turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IRContentBlock {
	Text { text: String },
	Image { source: ImageSource },
	ToolUse { id: String, name: String, input: Value },
	ToolResult { tool_use_id: String, content: String, is_error: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImageSource {
	Url { url: String },
	Base64 { data: String, media_type: String },
}

/// A message's content: plain text, or an ordered list of content blocks.
/// Frontend adapters normalize dialect-specific content shapes into this;
/// unknown block types fall back to a `Text` block via string serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IRContent {
	Text(String),
	Blocks(Vec<IRContentBlock>),
}

impl IRContent {
	pub fn text(s: impl Into<String>) -> Self {
		IRContent::Text(s.into())
	}

	/// Best-effort flattening to plain text, concatenating text blocks and
	/// dropping non-text blocks. Used by adapters whose dialect has no concept
	/// of structured content.
	pub fn as_text(&self) -> String {
		match self {
			IRContent::Text(t) => t.clone(),
			IRContent::Blocks(blocks) => blocks
				.iter()
				.filter_map(|b| match b {
					IRContentBlock::Text { text } => Some(text.as_str()),
					_ => None,
				})
				.collect::<Vec<_>>()
				.join(""),
		}
	}

	pub fn is_empty(&self) -> bool {
		match self {
			IRContent::Text(t) => t.is_empty(),
			IRContent::Blocks(b) => b.is_empty(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
	#[serde(default, skip_serializing_if = "HashMap::is_empty")]
	pub custom: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRMessage {
	pub role: Role,
	pub content: IRContent,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<MessageMetadata>,
}

impl IRMessage {
	pub fn new(role: Role, content: impl Into<IRContent>) -> Self {
		Self { role, content: content.into(), metadata: None }
	}

	pub fn system(text: impl Into<String>) -> Self {
		Self::new(Role::System, IRContent::text(text))
	}

	pub fn user(text: impl Into<String>) -> Self {
		Self::new(Role::User, IRContent::text(text))
	}

	pub fn assistant(text: impl Into<String>) -> Self {
		Self::new(Role::Assistant, IRContent::text(text))
	}
}

impl From<String> for IRContent {
	fn from(s: String) -> Self {
		IRContent::Text(s)
	}
}

impl From<&str> for IRContent {
	fn from(s: &str) -> Self {
		IRContent::Text(s.to_string())
	}
}

impl From<Vec<IRContentBlock>> for IRContent {
	fn from(blocks: Vec<IRContentBlock>) -> Self {
		IRContent::Blocks(blocks)
	}
}
