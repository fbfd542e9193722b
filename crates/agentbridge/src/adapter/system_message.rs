use crate::adapter::SystemMessageStrategy;
use crate::ir::{IRContent, IRMessage, Role};

/// Rearranges system messages per the backend's declared strategy (§4.1),
/// run by the Bridge/Router just before a backend executes. `supports_multiple`
/// governs the `separate-parameter` case: when true, each system message
/// survives as a distinct sidecar entry in original order; when false, they
/// are newline-joined into the vec's sole entry, for backends whose wire
/// format has exactly one "system" slot.
///
/// Returns the (possibly reordered/rewritten) messages and the sidecar
/// entries for `separate-parameter` backends, which the caller passes to the
/// backend adapter out of band (e.g. as a wire-format "system" field) rather
/// than inlining them back into `messages`.
pub fn normalize_system_messages(messages: Vec<IRMessage>, strategy: SystemMessageStrategy, supports_multiple: bool) -> (Vec<IRMessage>, Option<Vec<String>>) {
	match strategy {
		SystemMessageStrategy::InMessages => (messages, None),
		SystemMessageStrategy::SeparateParameter => {
			let (system, rest) = partition_system(messages);
			if system.is_empty() {
				return (rest, None);
			}
			let sidecar = if supports_multiple { system } else { vec![system.join("\n")] };
			(rest, Some(sidecar))
		},
		SystemMessageStrategy::PrependUser => {
			let (system, mut rest) = partition_system(messages);
			if system.is_empty() {
				return (rest, None);
			}
			let prefix = system.join("\n");
			match rest.iter_mut().find(|m| m.role == Role::User) {
				Some(first_user) => {
					let existing = first_user.content.as_text();
					first_user.content = IRContent::text(format!("{prefix}\n\n{existing}"));
				},
				None => rest.insert(0, IRMessage::user(prefix)),
			}
			(rest, None)
		},
		SystemMessageStrategy::NotSupported => {
			let (system, rest) = partition_system(messages);
			if !system.is_empty() {
				tracing::warn!(count = system.len(), "dropping system message(s): backend declares systemMessageStrategy = not-supported");
			}
			(rest, None)
		},
	}
}

fn partition_system(messages: Vec<IRMessage>) -> (Vec<String>, Vec<IRMessage>) {
	let mut system = Vec::new();
	let mut rest = Vec::new();
	for m in messages {
		if m.role == Role::System {
			system.push(m.content.as_text());
		} else {
			rest.push(m);
		}
	}
	(system, rest)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn msgs() -> Vec<IRMessage> {
		vec![IRMessage::system("be terse"), IRMessage::system("never apologize"), IRMessage::user("hi")]
	}

	#[test]
	fn in_messages_is_passthrough() {
		let (out, sidecar) = normalize_system_messages(msgs(), SystemMessageStrategy::InMessages, true);
		assert_eq!(out.len(), 3);
		assert!(sidecar.is_none());
	}

	#[test]
	fn separate_parameter_joins_when_multiple_not_supported() {
		let (out, sidecar) = normalize_system_messages(msgs(), SystemMessageStrategy::SeparateParameter, false);
		assert_eq!(out.len(), 1);
		assert_eq!(sidecar, Some(vec!["be terse\nnever apologize".to_string()]));
	}

	#[test]
	fn separate_parameter_preserves_distinct_entries_when_multiple_supported() {
		let (out, sidecar) = normalize_system_messages(msgs(), SystemMessageStrategy::SeparateParameter, true);
		assert_eq!(out.len(), 1);
		assert_eq!(sidecar, Some(vec!["be terse".to_string(), "never apologize".to_string()]));
		// Must differ from the `supports_multiple = false` case, not just coincidentally match it.
		let (_, collapsed) = normalize_system_messages(msgs(), SystemMessageStrategy::SeparateParameter, false);
		assert_ne!(sidecar, collapsed);
	}

	#[test]
	fn prepend_user_prefixes_first_user_message() {
		let (out, sidecar) = normalize_system_messages(msgs(), SystemMessageStrategy::PrependUser, true);
		assert!(sidecar.is_none());
		assert_eq!(out.len(), 1);
		assert_eq!(out[0].role, Role::User);
		assert!(out[0].content.as_text().starts_with("be terse\nnever apologize"));
		assert!(out[0].content.as_text().ends_with("hi"));
	}

	#[test]
	fn not_supported_drops_system_messages() {
		let (out, sidecar) = normalize_system_messages(msgs(), SystemMessageStrategy::NotSupported, true);
		assert_eq!(out.len(), 1);
		assert_eq!(out[0].role, Role::User);
		assert!(sidecar.is_none());
	}

	#[test]
	fn prepend_user_inserts_synthetic_user_turn_when_absent() {
		let only_system = vec![IRMessage::system("be terse")];
		let (out, _) = normalize_system_messages(only_system, SystemMessageStrategy::PrependUser, true);
		assert_eq!(out.len(), 1);
		assert_eq!(out[0].role, Role::User);
		assert_eq!(out[0].content.as_text(), "be terse");
	}
}
