// ABOUTME: MCP client for connecting to MCP servers via stdio or streamable HTTP.
// ABOUTME: Runs the initialize handshake, then lists and calls tools.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::transport::{HttpTransport, StdioTransport, Transport};
use super::{
    McpInitializeParams, McpInitializeResult, McpServerConfig, McpToolInfo, McpToolResult,
    McpToolsListResult, McpTransport,
};
use crate::error::McpError;

/// Lifecycle of a protocol client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// Client for communicating with an MCP server.
pub struct McpClient {
    name: String,
    transport: Arc<dyn Transport>,
    state: Mutex<ClientState>,
}

impl McpClient {
    /// Connect to an MCP server and run the handshake.
    ///
    /// Transport failures (spawn errors, malformed URLs) are returned. A failed
    /// handshake is only logged: the client is still returned, and later calls
    /// surface whatever the server does with them.
    pub async fn connect(config: McpServerConfig, timeout: Duration) -> Result<Self, McpError> {
        let transport: Arc<dyn Transport> = match &config.transport {
            McpTransport::Stdio { command, args, env } => {
                Arc::new(StdioTransport::connect(command, args, env, timeout).await?)
            }
            McpTransport::Http { url, headers } => {
                Arc::new(HttpTransport::connect(url, headers, timeout).await?)
            }
        };

        let client = Self::with_transport(config.name, transport);
        if let Err(e) = client.initialize().await {
            warn!(server = %client.name, error = %e, "MCP handshake failed");
        }
        Ok(client)
    }

    /// Wrap an already-built transport. No handshake is performed.
    pub fn with_transport(name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            transport,
            state: Mutex::new(ClientState::Uninitialized),
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ClientState {
        *self.state.lock().await
    }

    /// Send a request and wait for response.
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        if *self.state.lock().await == ClientState::Closed {
            return Err(McpError::Connection(format!("client '{}' is closed", self.name)));
        }

        let response = self.transport.request(method, params).await?;

        if let Some(error) = response.error {
            return Err(McpError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        response
            .result
            .ok_or_else(|| McpError::Protocol("No result in response".into()))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Run the initialize exchange followed by the `initialized` notification.
    pub async fn initialize(&self) -> Result<McpInitializeResult, McpError> {
        {
            let mut state = self.state.lock().await;
            if *state == ClientState::Closed {
                return Err(McpError::Connection(format!("client '{}' is closed", self.name)));
            }
            *state = ClientState::Initializing;
        }

        let outcome = async {
            let params = serde_json::to_value(McpInitializeParams::default())?;
            let result = self.request("initialize", Some(params)).await?;
            let init_result: McpInitializeResult = serde_json::from_value(result)?;
            self.transport.notify("notifications/initialized", None).await?;
            Ok::<_, McpError>(init_result)
        }
        .await;

        let mut state = self.state.lock().await;
        match &outcome {
            Ok(init) => {
                *state = ClientState::Ready;
                info!(
                    server = %self.name,
                    remote = init.server_info.as_ref().map(|s| s.name.as_str()).unwrap_or("?"),
                    "MCP server ready"
                );
            }
            Err(_) => *state = ClientState::Uninitialized,
        }
        outcome
    }

    /// Shut the connection down. Idempotent.
    pub async fn close(&self) -> Result<(), McpError> {
        let mut state = self.state.lock().await;
        if *state == ClientState::Closed {
            return Ok(());
        }
        *state = ClientState::Closed;
        drop(state);

        debug!(server = %self.name, "closing MCP client");
        self.transport.shutdown().await
    }

    // ========================================================================
    // Tools
    // ========================================================================

    /// List available tools from the server.
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        let result = self.request("tools/list", None).await?;
        let list: McpToolsListResult = serde_json::from_value(result)?;
        Ok(list.tools)
    }

    /// Call a tool on the server.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolResult, McpError> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments
        });

        let result = self.request("tools/call", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }
}
