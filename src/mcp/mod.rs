// ABOUTME: MCP module - Model Context Protocol client implementation.
// ABOUTME: Connects to MCP servers via stdio or streamable HTTP and lists/calls their tools.

mod client;
mod transport;
mod types;

pub use client::{ClientState, McpClient};
pub use transport::{HttpTransport, StdioTransport, Transport};
pub use types::*;
