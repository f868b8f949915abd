// Public modules
pub mod backend;
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod render;
pub mod sse;
pub mod types;
pub mod utils;

// Re-exports
pub use backend::{AgentBackend, EventStream};
pub use client::AgentClient;
pub use client_logger::{ClientLogger, JsonlClientLogger};
pub use error::{Error, ErrorKind, Result};
pub use observability::register_biometrics;
pub use render::{PlainTextRenderer, Renderer};
pub use sse::process_sse;
pub use types::*;
