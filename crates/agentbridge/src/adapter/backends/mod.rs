//! Concrete backend adapters (§4.1, "Backend-execution surfaces"). Out of
//! scope as a *contract* beyond the `BackendAdapter` trait itself; a single
//! `reqwest`-based HTTP backend is provided as a reference implementation so
//! the pipeline is runnable end to end and exercisable against `wiremock`.

mod dialect;
mod http;

pub use dialect::{AnthropicDialect, BackendDialect, OpenAIDialect};
pub use http::HttpBackendAdapter;
