use crate::ir::{BridgeError, IRChatResponse, IRMessage, Role};
use crate::middleware::{Context, Middleware, Next};

/// Truncates older turns once the message count exceeds `max_messages`,
/// keeping any leading system messages plus the most recent
/// `keep_recent` turns, and replacing the dropped middle with a single
/// synthetic user-role summary turn. Summarization itself (an LLM call) is
/// out of scope for the reference implementation; the synthetic turn is a
/// placeholder callers can post-process or override via `summarizer`.
pub struct HistoryCompactionMiddleware {
	max_messages: usize,
	keep_recent: usize,
	summarizer: Option<Box<dyn Fn(&[IRMessage]) -> String + Send + Sync>>,
}

impl HistoryCompactionMiddleware {
	pub fn new(max_messages: usize, keep_recent: usize) -> Self {
		Self { max_messages, keep_recent, summarizer: None }
	}

	pub fn with_summarizer(mut self, f: impl Fn(&[IRMessage]) -> String + Send + Sync + 'static) -> Self {
		self.summarizer = Some(Box::new(f));
		self
	}

	fn compact(&self, messages: Vec<IRMessage>) -> Vec<IRMessage> {
		if messages.len() <= self.max_messages {
			return messages;
		}
		let split = messages.iter().position(|m| m.role != Role::System).unwrap_or(messages.len());
		let (system, rest) = messages.split_at(split);
		if rest.len() <= self.keep_recent {
			return messages.to_vec();
		}
		let dropped_count = rest.len() - self.keep_recent;
		let (dropped, recent) = rest.split_at(dropped_count);
		let summary_text = match &self.summarizer {
			Some(f) => f(dropped),
			None => format!("[{} earlier messages omitted]", dropped.len()),
		};
		let mut out = system.to_vec();
		out.push(IRMessage::user(summary_text));
		out.extend_from_slice(recent);
		out
	}
}

#[async_trait::async_trait]
impl Middleware for HistoryCompactionMiddleware {
	fn name(&self) -> &str {
		"history-compaction"
	}

	async fn handle(&self, mut ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError> {
		ctx.request.messages = self.compact(std::mem::take(&mut ctx.request.messages));
		next.call(ctx).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn messages(n: usize) -> Vec<IRMessage> {
		(0..n).map(|i| IRMessage::user(format!("turn {i}"))).collect()
	}

	#[test]
	fn leaves_short_histories_untouched() {
		let mw = HistoryCompactionMiddleware::new(10, 4);
		let out = mw.compact(messages(5));
		assert_eq!(out.len(), 5);
	}

	#[test]
	fn compacts_and_keeps_recent_turns() {
		let mw = HistoryCompactionMiddleware::new(10, 4);
		let out = mw.compact(messages(20));
		// 1 summary turn + 4 recent
		assert_eq!(out.len(), 5);
		assert_eq!(out.last().unwrap().content.as_text(), "turn 19");
	}

	#[test]
	fn preserves_leading_system_messages() {
		let mw = HistoryCompactionMiddleware::new(10, 2);
		let mut msgs = vec![IRMessage::system("be terse")];
		msgs.extend(messages(20));
		let out = mw.compact(msgs);
		assert_eq!(out[0].role, Role::System);
	}
}
