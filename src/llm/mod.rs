// ABOUTME: LLM module - client abstraction for language model providers.
// ABOUTME: Canonical types, the LlmClient trait, and the three provider adapters.

mod anthropic;
mod client;
mod ollama;
mod openai;
mod types;

pub use anthropic::*;
pub use client::*;
pub use ollama::*;
pub use openai::*;
pub use types::*;

#[cfg(test)]
mod types_test;

#[cfg(test)]
mod anthropic_test;
