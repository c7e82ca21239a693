// ABOUTME: "Thinking" spinner shown while the model works, and an approval
// ABOUTME: handler that hides it while the user is asked to confirm a command.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use conch::permission::{ApprovalHandler, ApprovalRequest};
use indicatif::{ProgressBar, ProgressStyle};

/// A restartable spinner on stderr. Disabled spinners do nothing.
pub struct Spinner {
    bar: Mutex<Option<ProgressBar>>,
    enabled: bool,
}

impl Spinner {
    pub fn new(enabled: bool) -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
            enabled,
        })
    }

    pub fn start(&self, message: &str) {
        if !self.enabled {
            return;
        }
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };
        if let Some(old) = slot.take() {
            old.finish_and_clear();
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        *slot = Some(pb);
    }

    pub fn stop(&self) {
        if let Ok(mut slot) = self.bar.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }
}

/// Stops the spinner for the duration of a confirmation prompt.
pub struct PausingApproval<H> {
    inner: H,
    spinner: Arc<Spinner>,
}

impl<H> PausingApproval<H> {
    pub fn new(inner: H, spinner: Arc<Spinner>) -> Self {
        Self { inner, spinner }
    }
}

#[async_trait]
impl<H: ApprovalHandler> ApprovalHandler for PausingApproval<H> {
    async fn request_approval(&self, request: &ApprovalRequest) -> Result<bool, anyhow::Error> {
        self.spinner.stop();
        let answer = self.inner.request_approval(request).await;
        self.spinner.start("Thinking");
        answer
    }
}
