//! Opaque identifier generation. `request_id` is stamped once, at the frontend
//! adapter boundary, and treated as immutable for the life of a request.

use crate::strng::Strng;

pub fn request_id() -> Strng {
	Strng::from(uuid::Uuid::new_v4().to_string())
}
