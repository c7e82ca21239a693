// ABOUTME: Defines the ToolResult type - the outcome of one tool call, keyed by
// ABOUTME: the call's correlation id, plus the byte-cap truncation helper.

/// Appended to any output that was cut to fit a byte ceiling.
pub const TRUNCATION_MARKER: &str = "\n... [truncated]";

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    /// Id of the tool call this answers.
    pub call_id: String,

    /// The output content.
    pub content: String,

    /// Whether this result represents an error.
    pub is_error: bool,

    /// Whether `content` was cut to a byte ceiling.
    pub truncated: bool,
}

impl ToolResult {
    /// Create a successful text result.
    pub fn text(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
            truncated: false,
        }
    }

    /// Create an error result.
    pub fn error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: message.into(),
            is_error: true,
            truncated: false,
        }
    }

    /// Cap the content at `max_bytes`.
    pub fn capped(mut self, max_bytes: usize) -> Self {
        if truncate_utf8(&mut self.content, max_bytes) {
            self.truncated = true;
        }
        self
    }
}

/// Cut `text` to at most `max_bytes` bytes on a char boundary and append
/// [`TRUNCATION_MARKER`]. Returns whether anything was cut.
pub fn truncate_utf8(text: &mut String, max_bytes: usize) -> bool {
    if text.len() <= max_bytes {
        return false;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text.push_str(TRUNCATION_MARKER);
    true
}
