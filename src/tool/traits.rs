// ABOUTME: Defines the ToolSource trait - anything that can list and call tools.
// ABOUTME: McpClient is the production implementation; tests plug in mocks.

use async_trait::async_trait;

use crate::error::McpError;
use crate::mcp::{McpClient, McpToolInfo, McpToolResult};

/// A provider of tools: one MCP server connection in production.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Configured name of this source. Group labels derive from it.
    fn name(&self) -> &str;

    /// Fetch the source's tool descriptors.
    async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError>;

    /// Invoke one tool.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolResult, McpError>;

    /// Release the underlying connection.
    async fn close(&self) -> Result<(), McpError> {
        Ok(())
    }
}

#[async_trait]
impl ToolSource for McpClient {
    fn name(&self) -> &str {
        McpClient::name(self)
    }

    async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        McpClient::list_tools(self).await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolResult, McpError> {
        McpClient::call_tool(self, name, arguments).await
    }

    async fn close(&self) -> Result<(), McpError> {
        McpClient::close(self).await
    }
}
