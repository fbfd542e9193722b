use serde::{Deserialize, Serialize};

use super::message::Role;
use super::request::IRMetadata;
use super::response::{FinishReason, IRChatResponse, Usage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamError {
	pub code: String,
	pub message: String,
}

/// One event in an `IRChatResponse` stream. Exactly one of `Done`/`Error`
/// terminates the sequence (§3 invariant); `sequence` in `Content` is strictly
/// increasing from 0 within a single stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IRStreamChunk {
	Start { metadata: IRMetadata },
	Content {
		sequence: u64,
		delta: String,
		role: Role,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		accumulated: Option<String>,
	},
	Metadata { usage: Option<Usage>, model: Option<String> },
	Done {
		finish_reason: FinishReason,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		message: Option<IRChatResponse>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		usage: Option<Usage>,
	},
	Error { error: StreamError },
}

impl IRStreamChunk {
	pub fn is_terminal(&self) -> bool {
		matches!(self, IRStreamChunk::Done { .. } | IRStreamChunk::Error { .. })
	}

	pub fn sequence(&self) -> Option<u64> {
		match self {
			IRStreamChunk::Content { sequence, .. } => Some(*sequence),
			_ => None,
		}
	}

	pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
		IRStreamChunk::Error { error: StreamError { code: code.into(), message: message.into() } }
	}
}

/// A validating wrapper that asserts the stream invariants from §3/§8 as chunks
/// are consumed: sequence numbers strictly increasing from 0, and exactly one
/// terminator. Adapters and the Bridge wrap backend streams in this so a
/// misbehaving `BackendAdapter` fails loudly instead of corrupting downstream
/// state silently.
pub struct StreamInvariantChecker {
	next_sequence: u64,
	terminated: bool,
}

impl Default for StreamInvariantChecker {
	fn default() -> Self {
		Self { next_sequence: 0, terminated: false }
	}
}

impl StreamInvariantChecker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Validates the next chunk. Returns `Err` with a description if the
	/// invariant is violated; callers should turn this into a `StreamError`
	/// terminal chunk rather than panicking.
	pub fn observe(&mut self, chunk: &IRStreamChunk) -> Result<(), String> {
		if self.terminated {
			return Err("chunk observed after stream terminator".to_string());
		}
		if let Some(seq) = chunk.sequence() {
			if seq != self.next_sequence {
				return Err(format!("out-of-order sequence: expected {}, got {seq}", self.next_sequence));
			}
			self.next_sequence += 1;
		}
		if chunk.is_terminal() {
			self.terminated = true;
		}
		Ok(())
	}

	pub fn terminated(&self) -> bool {
		self.terminated
	}
}
