// ABOUTME: Transport abstraction for MCP communication.
// ABOUTME: Re-exports the stdio (child process) and streamable HTTP transports.

mod http;
mod stdio;

pub use http::HttpTransport;
pub use stdio::StdioTransport;

use async_trait::async_trait;

use super::McpResponse;
use crate::error::McpError;

/// Trait for MCP transport implementations.
///
/// Each transport owns one session and numbers its own requests. Calls on a
/// single transport are serialized: a request is not issued until the
/// previous response has been fully consumed.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and receive the response carrying the same id.
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<McpResponse, McpError>;

    /// Send a notification (no response expected).
    async fn notify(&self, method: &str, params: Option<serde_json::Value>)
    -> Result<(), McpError>;

    /// Shutdown the transport. Safe to call more than once.
    async fn shutdown(&self) -> Result<(), McpError>;
}
