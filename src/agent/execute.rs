// ABOUTME: The run_command pseudo-tool - confirm with the user, then run via the shell.
// ABOUTME: Captures combined output, enforces a timeout, and caps the output size.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::permission::{ApprovalHandler, ApprovalRequest};
use crate::tool::truncate_utf8;

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;
pub const MAX_COMMAND_TIMEOUT_SECS: u64 = 600;

/// Returned when the user says anything but yes.
pub const DECLINED: &str = "User declined to run the command.";

/// Seconds to allow, from the optional `timeout` argument, clamped to 1..=600.
pub fn command_timeout(args: &Map<String, Value>) -> u64 {
    let requested = match args.get("timeout") {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.max(0.0).round() as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    requested
        .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS)
        .clamp(1, MAX_COMMAND_TIMEOUT_SECS)
}

fn shell(command: &str) -> tokio::process::Command {
    if cfg!(target_os = "windows") {
        let mut c = tokio::process::Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = tokio::process::Command::new("sh");
        c.arg("-c").arg(command);
        c
    }
}

/// Handle one `run_command` call.
///
/// Nothing is spawned unless `approval` says yes. The returned text is what
/// the model sees; spawn failures are errors.
pub async fn run_command(
    args: &Map<String, Value>,
    approval: &dyn ApprovalHandler,
    max_output_bytes: usize,
) -> Result<String, anyhow::Error> {
    let command = args
        .get("command")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| anyhow!("missing required argument 'command'"))?;
    let timeout = command_timeout(args);

    let request = ApprovalRequest {
        tool: "run_command".to_string(),
        command: command.to_string(),
    };
    if !approval.request_approval(&request).await? {
        info!(command, "command declined");
        return Ok(DECLINED.to_string());
    }

    debug!(command, timeout, "running command");
    let child = shell(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to start '{}'", command))?;

    // Dropping the wait future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(
        Duration::from_secs(timeout),
        child.wait_with_output(),
    )
    .await
    {
        Ok(output) => output?,
        Err(_) => return Ok(format!("Command timed out after {}s", timeout)),
    };

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }

    if !output.status.success() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        match output.status.code() {
            Some(code) => text.push_str(&format!("[exit code {}]", code)),
            None => text.push_str("[terminated by signal]"),
        }
    } else if text.is_empty() {
        text.push_str("(no output)");
    }

    truncate_utf8(&mut text, max_output_bytes);
    Ok(text)
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::permission::{AlwaysApprove, AlwaysReject, LineApproval};
    use crate::tool::TRUNCATION_MARKER;

    fn args(value: serde_json::Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    /// Counts how often it was consulted.
    struct Counting(AtomicUsize, bool);

    #[async_trait]
    impl ApprovalHandler for Counting {
        async fn request_approval(&self, _r: &ApprovalRequest) -> Result<bool, anyhow::Error> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(self.1)
        }
    }

    #[test]
    fn test_timeout_clamping() {
        assert_eq!(command_timeout(&args(serde_json::json!({}))), 30);
        assert_eq!(command_timeout(&args(serde_json::json!({"timeout": 0}))), 1);
        assert_eq!(command_timeout(&args(serde_json::json!({"timeout": 9000}))), 600);
        assert_eq!(command_timeout(&args(serde_json::json!({"timeout": "45"}))), 45);
        assert_eq!(command_timeout(&args(serde_json::json!({"timeout": 2.6}))), 3);
        assert_eq!(command_timeout(&args(serde_json::json!({"timeout": -5}))), 1);
    }

    #[tokio::test]
    async fn test_approved_command_runs() {
        let out = run_command(
            &args(serde_json::json!({"command": "echo hello"})),
            &AlwaysApprove,
            10_000,
        )
        .await
        .unwrap();
        assert_eq!(out, "hello\n");
    }

    #[tokio::test]
    async fn test_declined_command_never_runs() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let command = format!("touch {}", marker.display());

        for input in ["n\n", "\n", "", "nope\n"] {
            let handler = LineApproval::new(input.as_bytes(), Vec::new());
            let out = run_command(
                &args(serde_json::json!({"command": command})),
                &handler,
                10_000,
            )
            .await
            .unwrap();
            assert_eq!(out, DECLINED);
        }
        assert!(!marker.exists());

        let out = run_command(
            &args(serde_json::json!({"command": command})),
            &AlwaysReject,
            10_000,
        )
        .await
        .unwrap();
        assert_eq!(out, DECLINED);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_yes_runs_command() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let handler = LineApproval::new("YES\n".as_bytes(), Vec::new());

        run_command(
            &args(serde_json::json!({"command": format!("touch {}", marker.display())})),
            &handler,
            10_000,
        )
        .await
        .unwrap();

        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_missing_command_is_error_without_prompt() {
        let handler = Counting(AtomicUsize::new(0), true);
        let result = run_command(&args(serde_json::json!({})), &handler, 10_000).await;
        assert!(result.is_err());
        assert_eq!(handler.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_combined_output_and_exit_code() {
        let out = run_command(
            &args(serde_json::json!({"command": "echo out; echo err >&2; exit 3"})),
            &AlwaysApprove,
            10_000,
        )
        .await
        .unwrap();
        assert!(out.contains("out\n"));
        assert!(out.contains("err\n"));
        assert!(out.ends_with("[exit code 3]"));
    }

    #[tokio::test]
    async fn test_silent_success() {
        let out = run_command(
            &args(serde_json::json!({"command": "true"})),
            &AlwaysApprove,
            10_000,
        )
        .await
        .unwrap();
        assert_eq!(out, "(no output)");
    }

    #[tokio::test]
    async fn test_output_is_truncated() {
        let out = run_command(
            &args(serde_json::json!({"command": "printf 'x%.0s' $(seq 1 500)"})),
            &AlwaysApprove,
            100,
        )
        .await
        .unwrap();
        assert_eq!(out, format!("{}{}", "x".repeat(100), TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let out = run_command(
            &args(serde_json::json!({"command": "sleep 5", "timeout": 1})),
            &AlwaysApprove,
            10_000,
        )
        .await
        .unwrap();
        assert_eq!(out, "Command timed out after 1s");
    }
}
