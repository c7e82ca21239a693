// ABOUTME: Conversation runner - drives one user turn through model rounds and tool calls.
// ABOUTME: Dispatches built-ins before registry routing and threads results back per provider.

use std::sync::Arc;

use tracing::{debug, info};

use super::{manage_tools, run_command, BuiltinTool, MemoryContext};
use crate::error::{LlmError, ToolError};
use crate::llm::{LlmClient, Message, Request, ToolCall, Usage};
use crate::permission::ApprovalHandler;
use crate::tool::{ActiveTools, ToolCatalog, ToolResult};

/// State shared between turns and the code driving them.
#[derive(Debug, Default)]
pub struct TurnContext {
    /// Set when preferences or sources changed; the active tool set is
    /// recomputed before the next model call.
    pub tools_changed: bool,

    /// Rounds used by the most recent turn.
    pub rounds: usize,
}

/// Text returned when a turn hits the round ceiling.
pub fn stopped_message(rounds: usize) -> String {
    format!("[Stopped after {} tool rounds without a final answer]", rounds)
}

/// A multi-turn conversation with tool access.
pub struct Conversation {
    client: Arc<dyn LlmClient>,
    catalog: ToolCatalog,
    approval: Arc<dyn ApprovalHandler>,
    memory: Option<Arc<dyn MemoryContext>>,
    model: String,
    system_prompt: String,
    max_tokens: Option<u32>,
    history: Vec<Message>,
    active: Option<ActiveTools>,
    usage: Usage,
}

impl Conversation {
    pub fn new(
        client: Arc<dyn LlmClient>,
        catalog: ToolCatalog,
        approval: Arc<dyn ApprovalHandler>,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client,
            catalog,
            approval,
            memory: None,
            model: model.into(),
            system_prompt: system_prompt.into(),
            max_tokens: None,
            history: Vec::new(),
            active: None,
            usage: Usage::default(),
        }
    }

    /// Attach a memory store consulted once per turn.
    pub fn with_memory(mut self, memory: Arc<dyn MemoryContext>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut ToolCatalog {
        &mut self.catalog
    }

    /// Token usage across every model call so far.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Forget the conversation so far.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    fn system_for(&self, input: &str) -> String {
        let context = self
            .memory
            .as_ref()
            .map(|m| m.build_context(input))
            .unwrap_or_default();
        if context.trim().is_empty() {
            self.system_prompt.clone()
        } else {
            format!("{}\n\n{}", self.system_prompt, context)
        }
    }

    /// Run one user turn to a final answer or the round ceiling.
    ///
    /// Provider errors end the turn and leave history as it was before it.
    pub async fn run_turn(
        &mut self,
        input: &str,
        ctx: &mut TurnContext,
    ) -> Result<String, LlmError> {
        let checkpoint = self.history.len();
        self.history.push(Message::user(input));

        let outcome = self.run_rounds(input, ctx).await;
        if outcome.is_err() {
            self.history.truncate(checkpoint);
        }
        outcome
    }

    async fn run_rounds(
        &mut self,
        input: &str,
        ctx: &mut TurnContext,
    ) -> Result<String, LlmError> {
        let max_rounds = self.catalog.settings().max_rounds;
        let system = self.system_for(input);
        ctx.rounds = 0;

        for round in 1..=max_rounds {
            ctx.rounds = round;

            if ctx.tools_changed || self.active.is_none() {
                let active = self.catalog.active().await;
                debug!(tools = active.len(), "recomputed active tools");
                self.active = Some(active);
                ctx.tools_changed = false;
            }
            let tools = self
                .active
                .as_ref()
                .map(|a| a.definitions().to_vec())
                .unwrap_or_default();

            let mut request = Request::new(&self.model)
                .system(system.clone())
                .messages(self.history.clone())
                .tools(tools);
            request.max_tokens = self.max_tokens;

            let response = self.client.create_message(&request).await?;
            self.usage.input_tokens += response.usage.input_tokens;
            self.usage.output_tokens += response.usage.output_tokens;

            if !response.has_tool_calls() {
                let text = response.text().to_string();
                if !text.is_empty() {
                    self.history.push(Message::assistant(text.clone()));
                }
                return Ok(text);
            }

            debug!(round, calls = response.tool_calls.len(), "model requested tools");
            let mut results = Vec::with_capacity(response.tool_calls.len());
            for call in &response.tool_calls {
                results.push(self.execute(call, ctx).await);
            }

            self.client
                .result_appender()
                .append(&mut self.history, &response, &results);
        }

        info!(rounds = max_rounds, "turn hit the round ceiling");
        Ok(stopped_message(max_rounds))
    }

    async fn execute(&mut self, call: &ToolCall, ctx: &mut TurnContext) -> ToolResult {
        let args = call.arguments();
        let settings = self.catalog.settings();
        let max_result_bytes = settings.max_result_bytes;
        let max_output_bytes = settings.max_output_bytes;

        let outcome: Result<(String, bool), String> = match BuiltinTool::from_name(&call.name) {
            Some(BuiltinTool::RunCommand) => {
                run_command(&args, self.approval.as_ref(), max_output_bytes)
                    .await
                    .map(|text| (text, false))
                    .map_err(|e| e.to_string())
            }
            Some(BuiltinTool::ManageTools) => manage_tools(&args, &mut self.catalog, ctx)
                .await
                .map(|text| (text, false))
                .map_err(|e| e.to_string()),
            None => {
                if !self.catalog.registry().contains(&call.name).await {
                    debug!(tool = %call.name, "model called an unknown tool");
                    return ToolResult::error(
                        &call.id,
                        format!("Error: unknown tool '{}'", call.name),
                    )
                    .capped(max_result_bytes);
                }
                match self
                    .catalog
                    .registry()
                    .call(&call.name, serde_json::Value::Object(args))
                    .await
                {
                    Ok(result) => Ok((result.to_text(), result.is_error)),
                    // The source's own error reads better than the wrapper's.
                    Err(ToolError::Execution(e)) => Err(e.to_string()),
                    Err(e) => Err(e.to_string()),
                }
            }
        };

        let result = match outcome {
            Ok((text, false)) => ToolResult::text(&call.id, text),
            Ok((text, true)) => ToolResult::error(&call.id, text),
            Err(e) => ToolResult::error(
                &call.id,
                format!("Error executing '{}': {}", call.name, e),
            ),
        };
        result.capped(max_result_bytes)
    }
}
