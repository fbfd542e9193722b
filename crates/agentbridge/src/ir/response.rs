use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::IRMessage;
use super::request::IRMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
	Stop,
	Length,
	ContentFilter,
	ToolCalls,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
	pub prompt_tokens: u64,
	pub completion_tokens: u64,
	pub total_tokens: u64,
}

impl Usage {
	pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
		Self { prompt_tokens, completion_tokens, total_tokens: prompt_tokens + completion_tokens }
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IRChatResponse {
	pub message: IRMessage,
	pub finish_reason: FinishReason,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub usage: Option<Usage>,
	pub metadata: IRMetadata,
	/// The untranslated provider payload, kept around for adapters that need it
	/// for debugging or for fields the IR doesn't model. Never inspected by the
	/// core pipeline itself.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub raw: Option<Value>,
}
