// ABOUTME: The built-in pseudo-tools the model can call without any MCP server.
// ABOUTME: Dispatched by the conversation loop before registry routing.

use crate::llm::ToolDefinition;

/// A tool implemented inside conch itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinTool {
    /// Run a shell command after the user confirms it.
    RunCommand,
    /// Inspect and change which tools are active.
    ManageTools,
}

impl BuiltinTool {
    /// Every built-in, in the order they are offered to the model.
    pub const ALL: [BuiltinTool; 2] = [BuiltinTool::RunCommand, BuiltinTool::ManageTools];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "run_command" => Some(Self::RunCommand),
            "manage_tools" => Some(Self::ManageTools),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RunCommand => "run_command",
            Self::ManageTools => "manage_tools",
        }
    }

    pub fn definition(self) -> ToolDefinition {
        match self {
            Self::RunCommand => ToolDefinition {
                name: self.name().to_string(),
                description: "Run a shell command on the user's machine. The user sees the \
                              exact command and must approve it first. Returns combined \
                              stdout and stderr."
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "command": {
                            "type": "string",
                            "description": "The shell command to execute"
                        },
                        "timeout": {
                            "type": "integer",
                            "description": "Seconds before the command is killed (default 30, max 600)"
                        }
                    },
                    "required": ["command"]
                }),
            },
            Self::ManageTools => ToolDefinition {
                name: self.name().to_string(),
                description: "Inspect or change which tools are available. Actions: \
                              list_groups, enable_group, disable_group, search (find tools \
                              by keyword, including disabled ones), activate (turn on \
                              specific tools by name)."
                    .to_string(),
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "action": {
                            "type": "string",
                            "enum": ["list_groups", "enable_group", "disable_group", "search", "activate"]
                        },
                        "group": {
                            "type": "string",
                            "description": "Group label for enable_group / disable_group"
                        },
                        "query": {
                            "type": "string",
                            "description": "Keywords for search"
                        },
                        "tools": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Tool names for activate"
                        }
                    },
                    "required": ["action"]
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for tool in BuiltinTool::ALL {
            assert_eq!(BuiltinTool::from_name(tool.name()), Some(tool));
            assert_eq!(tool.definition().name, tool.name());
        }
        assert_eq!(BuiltinTool::from_name("bash"), None);
    }

    #[test]
    fn test_definitions_require_their_key_argument() {
        let run = BuiltinTool::RunCommand.definition();
        assert_eq!(run.input_schema["required"][0], "command");
        let manage = BuiltinTool::ManageTools.definition();
        assert_eq!(manage.input_schema["required"][0], "action");
    }
}
