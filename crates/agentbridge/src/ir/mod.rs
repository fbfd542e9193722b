//! The canonical Intermediate Representation (§3): a provider-agnostic shape
//! every frontend adapter converts into and every backend adapter converts
//! out of. Nothing in this module talks to the network or knows about any
//! particular provider's wire format.

pub mod error;
pub mod message;
pub mod request;
pub mod response;
pub mod stream;

pub use error::{BridgeError, ProvenancedError};
pub use message::{ImageSource, IRContent, IRContentBlock, IRMessage, MessageMetadata, Role};
pub use request::{IRChatRequest, IRMetadata, IRParameters, Provenance, SchemaHint, SchemaMode, StreamMode, ToolDefinition};
pub use response::{FinishReason, IRChatResponse, Usage};
pub use stream::{IRStreamChunk, StreamError, StreamInvariantChecker};
