use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::{Context, Middleware, Next};
use crate::ir::{BridgeError, IRChatResponse};

struct Entry {
	response: IRChatResponse,
	inserted_at: Instant,
}

/// Caches responses keyed by a stable hash of the normalized request
/// (model, messages, parameters — `request_id`/timestamp excluded, since
/// those are unique per call by construction and would defeat caching
/// entirely). A `parking_lot::Mutex`-guarded map, never held across an
/// `.await` (§5's shared-resource policy).
pub struct CachingMiddleware {
	store: Mutex<HashMap<u64, Entry>>,
	ttl: Duration,
}

impl CachingMiddleware {
	pub fn new(ttl: Duration) -> Self {
		Self { store: Mutex::new(HashMap::new()), ttl }
	}

	fn fingerprint(ctx: &Context) -> u64 {
		let mut hasher = DefaultHasher::new();
		for message in &ctx.request.messages {
			message.role.hash(&mut hasher);
			message.content.as_text().hash(&mut hasher);
		}
		if let Some(params) = &ctx.request.parameters {
			params.model.hash(&mut hasher);
			params.temperature.map(f64::to_bits).hash(&mut hasher);
			params.max_tokens.hash(&mut hasher);
		}
		hasher.finish()
	}
}

#[async_trait::async_trait]
impl Middleware for CachingMiddleware {
	fn name(&self) -> &str {
		"caching"
	}

	async fn handle(&self, mut ctx: Context, next: Next) -> Result<IRChatResponse, BridgeError> {
		let key = Self::fingerprint(&ctx);
		ctx.attachments.insert("cacheKey".to_string(), serde_json::json!(key.to_string()));

		{
			let mut store = self.store.lock();
			if let Some(entry) = store.get(&key) {
				if entry.inserted_at.elapsed() < self.ttl {
					return Ok(entry.response.clone());
				}
				store.remove(&key);
			}
		}

		let response = next.call(ctx).await?;
		self.store.lock().insert(key, Entry { response: response.clone(), inserted_at: Instant::now() });
		Ok(response)
	}
}
