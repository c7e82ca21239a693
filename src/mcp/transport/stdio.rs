// ABOUTME: Stdio transport for MCP communication.
// ABOUTME: Spawns a subprocess and exchanges line-delimited JSON-RPC over its pipes.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::Transport;
use crate::error::McpError;
use crate::mcp::{McpNotification, McpRequest, McpResponse};

/// How long a closing server gets to exit after SIGTERM before it is killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// One live child process and its pipes.
struct StdioSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Bytes of the line being read. Kept across calls so a timed-out read
    /// does not lose a partial line.
    line: Vec<u8>,
    next_id: u64,
}

impl StdioSession {
    async fn write_line(&mut self, json: &str) -> Result<(), McpError> {
        self.stdin.write_all(json.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read lines until the response for `id` shows up. Everything else
    /// (notifications, stale responses, noise) is dropped on the floor.
    /// Lines are raw bytes; a banner that is not UTF-8 is noise like any other.
    async fn read_response(&mut self, id: u64) -> Result<McpResponse, McpError> {
        loop {
            let read = self.stdout.read_until(b'\n', &mut self.line).await?;
            if read == 0 && self.line.is_empty() {
                return Err(McpError::Connection("MCP server closed connection".into()));
            }
            let line = std::mem::take(&mut self.line);

            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_slice::<McpResponse>(trimmed) {
                Ok(response) if response.id == Some(id) => return Ok(response),
                Ok(_) => debug!(awaiting = id, "discarding unrelated JSON-RPC line"),
                Err(_) => debug!(
                    awaiting = id,
                    bytes = trimmed.len(),
                    "discarding non-JSON line from server"
                ),
            }
        }
    }
}

/// Stdio transport - spawns a subprocess and communicates via JSON-RPC over stdin/stdout.
pub struct StdioTransport {
    session: Mutex<Option<StdioSession>>,
    timeout: Duration,
}

impl StdioTransport {
    /// Create a new stdio transport by spawning a subprocess.
    ///
    /// `env` entries are layered over the inherited environment.
    pub async fn connect(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env.iter())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        // Own process group, so a Ctrl+C at the terminal reaches only conch.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| McpError::Connection(format!("failed to spawn '{}': {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Connection("Failed to open stdin".into()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Connection("Failed to open stdout".into()))?;

        debug!(command, pid = child.id(), "spawned MCP server");

        Ok(Self {
            session: Mutex::new(Some(StdioSession {
                child,
                stdin,
                stdout: BufReader::new(stdout),
                line: Vec::new(),
                next_id: 1,
            })),
            timeout,
        })
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<McpResponse, McpError> {
        // The lock is held until the matching response is read.
        let mut guard = self.session.lock().await;
        let session = guard
            .as_mut()
            .ok_or_else(|| McpError::Connection("Server connection closed".into()))?;

        let id = session.next_id;
        session.next_id += 1;

        let json = serde_json::to_string(&McpRequest::new(id, method, params))?;
        debug!(id, method, "-> stdio request");
        session.write_line(&json).await?;

        tokio::time::timeout(self.timeout, session.read_response(id))
            .await
            .map_err(|_| McpError::Timeout(self.timeout))?
    }

    async fn notify(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let mut guard = self.session.lock().await;
        let session = guard
            .as_mut()
            .ok_or_else(|| McpError::Connection("Server connection closed".into()))?;

        let json = serde_json::to_string(&McpNotification::new(method, params))?;
        session.write_line(&json).await
    }

    async fn shutdown(&self) -> Result<(), McpError> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };

        let StdioSession {
            mut child, stdin, ..
        } = session;
        drop(stdin);

        request_termination(&mut child);

        if tokio::time::timeout(SHUTDOWN_GRACE, child.wait())
            .await
            .is_err()
        {
            warn!(pid = child.id(), "MCP server ignored SIGTERM, killing");
            let _ = child.kill().await;
        }

        Ok(())
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: kill(2) with a pid we spawned and still own.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) {
    let _ = child.start_kill();
}
