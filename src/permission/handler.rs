// ABOUTME: Defines the ApprovalHandler trait for confirming local command execution.
// ABOUTME: Includes a line-based terminal prompt and fixed approve/reject handlers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, Notify};
use tracing::debug;

/// What the model wants to run.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// The pseudo-tool asking.
    pub tool: String,

    /// The literal shell command.
    pub command: String,
}

/// Trait for handling approval requests.
#[async_trait]
pub trait ApprovalHandler: Send + Sync {
    /// Request approval for a command.
    ///
    /// Returns `Ok(true)` if approved, `Ok(false)` if rejected.
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<bool, anyhow::Error>;
}

/// Whether a typed answer approves. Only `y` and `yes` do.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Prints the command and reads one answer line.
///
/// End of input counts as a refusal, and so does an interrupt: when a
/// [`Notify`] is attached, waking its waiters abandons the wait.
pub struct LineApproval<R, W> {
    io: Mutex<(R, W)>,
    interrupt: Option<Arc<Notify>>,
}

impl<R, W> LineApproval<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
            interrupt: None,
        }
    }

    /// Decline the pending prompt whenever `interrupt` wakes its waiters.
    pub fn with_interrupt(mut self, interrupt: Arc<Notify>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }
}

impl LineApproval<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// Prompt on the terminal.
    pub fn stdio() -> Self {
        Self::new(
            tokio::io::BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
    }
}

#[async_trait]
impl<R, W> ApprovalHandler for LineApproval<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<bool, anyhow::Error> {
        let mut guard = self.io.lock().await;
        let (reader, writer) = &mut *guard;

        writer
            .write_all(format!("\n  $ {}\n  Run this command? [y/N] ", request.command).as_bytes())
            .await?;
        writer.flush().await?;

        let mut answer = String::new();
        let read = match &self.interrupt {
            Some(interrupt) => tokio::select! {
                read = reader.read_line(&mut answer) => read?,
                _ = interrupt.notified() => {
                    debug!(command = %request.command, "approval prompt interrupted");
                    0
                }
            },
            None => reader.read_line(&mut answer).await?,
        };
        if read == 0 {
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            return Ok(false);
        }
        Ok(is_affirmative(&answer))
    }
}

/// An approval handler that always approves.
pub struct AlwaysApprove;

#[async_trait]
impl ApprovalHandler for AlwaysApprove {
    async fn request_approval(&self, _request: &ApprovalRequest) -> Result<bool, anyhow::Error> {
        Ok(true)
    }
}

/// An approval handler that always rejects.
pub struct AlwaysReject;

#[async_trait]
impl ApprovalHandler for AlwaysReject {
    async fn request_approval(&self, _request: &ApprovalRequest) -> Result<bool, anyhow::Error> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(command: &str) -> ApprovalRequest {
        ApprovalRequest {
            tool: "run_command".into(),
            command: command.into(),
        }
    }

    async fn answer(input: &'static str) -> (bool, String) {
        let handler = LineApproval::new(input.as_bytes(), Vec::new());
        let approved = handler.request_approval(&request("rm -rf build")).await.unwrap();
        let (_, written) = handler.io.into_inner();
        (approved, String::from_utf8(written).unwrap())
    }

    #[test]
    fn test_is_affirmative() {
        for yes in ["y", "Y", "yes", " YES \n"] {
            assert!(is_affirmative(yes), "{:?}", yes);
        }
        for no in ["", "n", "no", "yep", "sure", "y es"] {
            assert!(!is_affirmative(no), "{:?}", no);
        }
    }

    #[tokio::test]
    async fn test_line_approval_prints_command() {
        let (approved, written) = answer("y\n").await;
        assert!(approved);
        assert!(written.contains("$ rm -rf build"));
    }

    #[tokio::test]
    async fn test_line_approval_declines() {
        assert!(!answer("n\n").await.0);
        assert!(!answer("\n").await.0);
        assert!(!answer("").await.0);
    }

    #[tokio::test]
    async fn test_line_approval_reads_one_line_per_request() {
        let handler = LineApproval::new("yes\nno\n".as_bytes(), Vec::new());
        assert!(handler.request_approval(&request("a")).await.unwrap());
        assert!(!handler.request_approval(&request("b")).await.unwrap());
    }

    #[tokio::test]
    async fn test_interrupt_declines_pending_prompt() {
        // The other end stays open and silent, so only the interrupt can end the wait.
        let (_keyboard, input) = tokio::io::duplex(64);
        let interrupt = Arc::new(Notify::new());
        let handler = LineApproval::new(tokio::io::BufReader::new(input), Vec::new())
            .with_interrupt(interrupt.clone());

        // Keep pressing Ctrl+C until someone is waiting.
        let ctrl_c = tokio::spawn(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                interrupt.notify_waiters();
            }
        });

        let approved = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            handler.request_approval(&request("rm -rf build")),
        )
        .await
        .expect("interrupt should end the wait")
        .unwrap();
        ctrl_c.abort();

        assert!(!approved);
        let (_, written) = handler.io.into_inner();
        assert!(String::from_utf8(written).unwrap().ends_with("[y/N] \n"));
    }

    #[tokio::test]
    async fn test_interrupt_before_prompt_is_not_remembered() {
        let interrupt = Arc::new(Notify::new());
        interrupt.notify_waiters();
        let handler =
            LineApproval::new("y\n".as_bytes(), Vec::new()).with_interrupt(interrupt);
        assert!(handler.request_approval(&request("ls")).await.unwrap());
    }

    #[tokio::test]
    async fn test_fixed_handlers() {
        assert!(AlwaysApprove.request_approval(&request("x")).await.unwrap());
        assert!(!AlwaysReject.request_approval(&request("x")).await.unwrap());
    }
}
