// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use conch::prelude::*;` to get started quickly.

pub use crate::agent::{BuiltinTool, Conversation, MemoryContext, StaticMemory, TurnContext};
pub use crate::config::{Config, Provider, ToolsConfig};
pub use crate::error::{ConchError, ConfigError, LlmError, McpError, ToolError};
pub use crate::llm::{
    AnthropicClient, BundledUserTurn, ContentBlock, LlmClient, Message, OllamaClient,
    OpenAIClient, PerResultMessages, Request, Response, ResultAppender, Role, StopReason,
    ToolCall, ToolDefinition, Usage,
};
pub use crate::mcp::{
    ClientState, HttpTransport, McpClient, McpServerConfig, McpToolInfo, McpToolResult,
    McpTransport, StdioTransport, Transport,
};
pub use crate::permission::{AlwaysApprove, AlwaysReject, ApprovalHandler, LineApproval};
pub use crate::tool::{
    ActiveTools, GroupSummary, Preferences, Registry, SearchHit, ToolCatalog, ToolResult,
    ToolSource,
};
