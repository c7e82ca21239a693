// ABOUTME: Root module for conch - the tool-calling core of a shell assistant.
// ABOUTME: Re-exports the public types from each subsystem.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod permission;
pub mod prelude;
pub mod tool;

pub use error::ConchError;
