// ABOUTME: Implements the Registry - the aggregated view of every source's tools,
// ABOUTME: routing each tool name to the one source that registered it first.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::ToolSource;
use crate::error::{McpError, ToolError};
use crate::llm::ToolDefinition;
use crate::mcp::{McpToolInfo, McpToolResult};

/// A tool descriptor together with the name of the source that owns it.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub info: McpToolInfo,
    pub source: String,
}

impl RegisteredTool {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.info.name.clone(),
            description: self.info.description.clone(),
            input_schema: self.info.input_schema.clone(),
        }
    }
}

#[derive(Default)]
struct Inner {
    /// Registration order.
    tools: Vec<RegisteredTool>,
    by_name: HashMap<String, usize>,
    sources: Vec<Arc<dyn ToolSource>>,
}

/// A thread-safe registry of tools and the sources that own them.
#[derive(Default)]
pub struct Registry {
    inner: Arc<RwLock<Inner>>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate several sources. Listings run concurrently, registration
    /// follows the order given, so name collisions resolve the same way
    /// every time. Sources whose listing fails are logged and contribute
    /// nothing.
    pub async fn from_sources(sources: Vec<Arc<dyn ToolSource>>) -> Self {
        let listings =
            futures::future::join_all(sources.iter().map(|s| s.list_tools())).await;

        let registry = Self::new();
        {
            let mut inner = registry.inner.write().await;
            for (source, listing) in sources.into_iter().zip(listings) {
                match listing {
                    Ok(tools) => {
                        let added = inner.insert_all(source.name(), tools);
                        info!(source = source.name(), tools = added, "registered tool source");
                    }
                    Err(e) => {
                        warn!(source = source.name(), error = %e, "excluding tool source");
                    }
                }
                inner.sources.push(source);
            }
        }
        registry
    }

    /// List one source's tools and register them. Returns how many names
    /// were added; names already present are skipped.
    pub async fn register_source(&self, source: Arc<dyn ToolSource>) -> Result<usize, McpError> {
        let tools = source.list_tools().await?;
        let mut inner = self.inner.write().await;
        let added = inner.insert_all(source.name(), tools);
        inner.sources.push(source);
        Ok(added)
    }

    /// Name of the source that owns `name`.
    pub async fn owner(&self, name: &str) -> Option<String> {
        let inner = self.inner.read().await;
        inner
            .by_name
            .get(name)
            .map(|&i| inner.tools[i].source.clone())
    }

    /// Check whether a tool name is registered.
    pub async fn contains(&self, name: &str) -> bool {
        self.inner.read().await.by_name.contains_key(name)
    }

    /// All registered tools in registration order.
    pub async fn tools(&self) -> Vec<RegisteredTool> {
        self.inner.read().await.tools.clone()
    }

    /// Get the number of registered tools.
    pub async fn count(&self) -> usize {
        self.inner.read().await.tools.len()
    }

    /// Names of the sources this registry was built from, in order.
    pub async fn source_names(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        inner.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Route a call to the owning source.
    pub async fn call(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolResult, ToolError> {
        let source = {
            let inner = self.inner.read().await;
            let owner = inner
                .by_name
                .get(name)
                .map(|&i| inner.tools[i].source.as_str())
                .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
            inner
                .sources
                .iter()
                .find(|s| s.name() == owner)
                .cloned()
                .ok_or_else(|| ToolError::NotFound(name.to_string()))?
        };

        debug!(tool = name, source = source.name(), "routing tool call");
        source
            .call_tool(name, arguments)
            .await
            .map_err(|e| ToolError::Execution(e.into()))
    }

    /// Close every source. Failures are logged; all sources are attempted.
    pub async fn close_all(&self) {
        let sources = std::mem::take(&mut self.inner.write().await.sources);
        for source in sources {
            if let Err(e) = source.close().await {
                warn!(source = source.name(), error = %e, "error closing tool source");
            }
        }
    }
}

impl Inner {
    fn insert_all(&mut self, source: &str, tools: Vec<McpToolInfo>) -> usize {
        let mut added = 0;
        for info in tools {
            if let Some(&existing) = self.by_name.get(&info.name) {
                debug!(
                    tool = %info.name,
                    kept = %self.tools[existing].source,
                    dropped = source,
                    "tool name collision, first registration wins"
                );
                continue;
            }
            self.by_name.insert(info.name.clone(), self.tools.len());
            self.tools.push(RegisteredTool {
                info,
                source: source.to_string(),
            });
            added += 1;
        }
        added
    }
}

impl Clone for Registry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
