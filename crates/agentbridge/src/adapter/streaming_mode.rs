use crate::ir::{IRStreamChunk, StreamMode};

/// Converts an `IRStreamChunk::Content` between delta and accumulated form
/// in place, given the accumulator's current state. The accumulator always
/// tracks the full concatenated text so far; `delta` is authoritative for
/// concatenation when both are present on the source chunk (§4.1).
///
/// Non-`Content` chunks pass through unchanged.
pub fn convert_chunk_mode(chunk: IRStreamChunk, source_mode: StreamMode, target_mode: StreamMode, accumulated_so_far: &mut String) -> IRStreamChunk {
	let IRStreamChunk::Content { sequence, delta, role, accumulated } = chunk else {
		return chunk;
	};

	let authoritative_delta = match source_mode {
		StreamMode::Delta => delta,
		StreamMode::Accumulated => {
			let full = accumulated.clone().unwrap_or_else(|| delta.clone());
			let diff = full.strip_prefix(accumulated_so_far.as_str()).map(str::to_string).unwrap_or_else(|| full.clone());
			diff
		},
	};
	accumulated_so_far.push_str(&authoritative_delta);

	match target_mode {
		StreamMode::Delta => IRStreamChunk::Content { sequence, delta: authoritative_delta, role, accumulated: None },
		StreamMode::Accumulated => {
			let snapshot = accumulated_so_far.clone();
			IRStreamChunk::Content { sequence, delta: authoritative_delta, role, accumulated: Some(snapshot) }
		},
	}
}

/// Stateful wrapper for converting an entire chunk sequence, used by
/// `FrontendAdapter::from_ir_stream` implementations so each call site
/// doesn't have to thread the accumulator string itself.
pub struct StreamModeConverter {
	source_mode: StreamMode,
	target_mode: StreamMode,
	accumulated: String,
}

impl StreamModeConverter {
	pub fn new(source_mode: StreamMode, target_mode: StreamMode) -> Self {
		Self { source_mode, target_mode, accumulated: String::new() }
	}

	pub fn convert(&mut self, chunk: IRStreamChunk) -> IRStreamChunk {
		convert_chunk_mode(chunk, self.source_mode, self.target_mode, &mut self.accumulated)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ir::Role;

	fn content(seq: u64, delta: &str, accumulated: Option<&str>) -> IRStreamChunk {
		IRStreamChunk::Content { sequence: seq, delta: delta.to_string(), role: Role::Assistant, accumulated: accumulated.map(String::from) }
	}

	#[test]
	fn delta_to_accumulated_builds_up() {
		let mut conv = StreamModeConverter::new(StreamMode::Delta, StreamMode::Accumulated);
		let c0 = conv.convert(content(0, "Hel", None));
		let c1 = conv.convert(content(1, "lo", None));
		match c0 {
			IRStreamChunk::Content { accumulated, .. } => assert_eq!(accumulated.as_deref(), Some("Hel")),
			_ => panic!(),
		}
		match c1 {
			IRStreamChunk::Content { accumulated, .. } => assert_eq!(accumulated.as_deref(), Some("Hello")),
			_ => panic!(),
		}
	}

	#[test]
	fn accumulated_to_delta_diffs_adjacent_chunks() {
		let mut conv = StreamModeConverter::new(StreamMode::Accumulated, StreamMode::Delta);
		let c0 = conv.convert(content(0, "Hel", Some("Hel")));
		let c1 = conv.convert(content(1, "lo", Some("Hello")));
		match c0 {
			IRStreamChunk::Content { delta, accumulated, .. } => {
				assert_eq!(delta, "Hel");
				assert!(accumulated.is_none());
			},
			_ => panic!(),
		}
		match c1 {
			IRStreamChunk::Content { delta, .. } => assert_eq!(delta, "lo"),
			_ => panic!(),
		}
	}

	#[test]
	fn non_content_chunks_pass_through() {
		let mut conv = StreamModeConverter::new(StreamMode::Delta, StreamMode::Accumulated);
		let done = IRStreamChunk::Done { finish_reason: crate::ir::FinishReason::Stop, message: None, usage: None };
		let out = conv.convert(done.clone());
		assert!(matches!(out, IRStreamChunk::Done { .. }));
	}
}
