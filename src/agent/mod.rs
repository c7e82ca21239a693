// ABOUTME: Agent module - the conversation loop and the pseudo-tools it dispatches.
// ABOUTME: Provides Conversation, TurnContext, BuiltinTool, run_command, and manage_tools.

mod builtin;
mod execute;
mod manager;
mod memory;
mod runner;

pub use builtin::BuiltinTool;
pub use execute::{
    command_timeout, run_command, DECLINED, DEFAULT_COMMAND_TIMEOUT_SECS, MAX_COMMAND_TIMEOUT_SECS,
};
pub use manager::manage_tools;
pub use memory::{MemoryContext, StaticMemory};
pub use runner::{stopped_message, Conversation, TurnContext};
