//! Core inference modules
//!
//! Prompt construction and the language model client used by the
//! inference proxy.

pub mod llm;
pub mod prompts;

pub use llm::{ChatModel, OpenAiChat};
pub use prompts::Prompt;
