// ABOUTME: Defines the LlmClient trait and the ResultAppender strategies that
// ABOUTME: decide how a round's tool results go back into the conversation.

use async_trait::async_trait;

use super::{ContentBlock, Message, Request, Response};
use crate::error::LlmError;
use crate::tool::ToolResult;

/// Trait for LLM client implementations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Create a message (non-streaming).
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError>;

    /// How this provider expects tool results to be threaded into history.
    fn result_appender(&self) -> &dyn ResultAppender;
}

/// Appends one completed round (the model's reply plus one result per call)
/// to the conversation history.
pub trait ResultAppender: Send + Sync {
    fn append(&self, history: &mut Vec<Message>, response: &Response, results: &[ToolResult]);
}

fn result_block(result: &ToolResult) -> ContentBlock {
    ContentBlock::ToolResult {
        tool_use_id: result.call_id.clone(),
        content: result.content.clone(),
        is_error: result.is_error,
    }
}

/// One assistant message, then a separate tool-role message per result.
/// Used by OpenAI-style and Ollama providers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerResultMessages;

impl ResultAppender for PerResultMessages {
    fn append(&self, history: &mut Vec<Message>, response: &Response, results: &[ToolResult]) {
        history.push(response.to_message());
        history.extend(results.iter().map(|r| Message::tool_result(result_block(r))));
    }
}

/// One assistant message, then a single user message holding every result.
/// Used by Anthropic.
#[derive(Debug, Default, Clone, Copy)]
pub struct BundledUserTurn;

impl ResultAppender for BundledUserTurn {
    fn append(&self, history: &mut Vec<Message>, response: &Response, results: &[ToolResult]) {
        history.push(response.to_message());
        history.push(Message::tool_results(
            results.iter().map(result_block).collect(),
        ));
    }
}
