//! Concrete frontend adapters (§4.1): one module per dialect, each a pure,
//! network-free translator between its wire types and the IR. Grounded on
//! the teacher's `llm::{openai,anthropic,gemini}` modules — a `types`
//! submodule holding the dialect's wire-format structs, plus free
//! `translate_request`/`translate_response` functions the adapter struct
//! delegates to.

pub mod anthropic;
pub mod gemini;
pub mod mistral;
pub mod ollama;
pub mod openai;

pub use anthropic::AnthropicFrontend;
pub use gemini::GeminiFrontend;
pub use mistral::MistralFrontend;
pub use ollama::OllamaFrontend;
pub use openai::OpenAIFrontend;
