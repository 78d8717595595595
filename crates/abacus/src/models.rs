//! The objects passed between the session, the agent and the provider.
//!
//! The provider speaks the OpenAI-compatible chat completions format; the
//! systems speak plain text tool calls. Everything is converted into these
//! internal structs at the boundary so the rest of the crate never handles
//! wire formats directly.
pub mod message;
pub mod role;
pub mod tool;
pub mod transcript;
