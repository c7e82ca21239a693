// ABOUTME: MemoryContext - the seam to a persistent memory store.
// ABOUTME: Only its context-building call is used; storage lives elsewhere.

/// Supplies remembered facts relevant to a query, appended to the system prompt.
pub trait MemoryContext: Send + Sync {
    /// Text to add to the system prompt for `query`. Empty means nothing relevant.
    fn build_context(&self, query: &str) -> String;
}

/// Fixed context, for tests and for callers that precompute it.
pub struct StaticMemory(pub String);

impl MemoryContext for StaticMemory {
    fn build_context(&self, _query: &str) -> String {
        self.0.clone()
    }
}
