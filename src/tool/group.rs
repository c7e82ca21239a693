// ABOUTME: Tool group derivation - the labels used for bulk enable/disable.
// ABOUTME: Groups are recomputed from tool names and owning sources, never stored.

use crate::agent::BuiltinTool;

/// Separator between service prefix and action in aggregator tool names.
pub const GROUP_SEPARATOR: char = '_';

/// Group label for a tool.
///
/// Built-in tools are singleton groups named after themselves. Tools from a
/// multi-service aggregator source are grouped by the lower-cased prefix
/// before the first `_` (`GITHUB_CREATE_ISSUE` is in `github`). Everything
/// else is grouped by its source name.
pub fn group_for(tool: &str, source: &str, aggregators: &[String]) -> String {
    if BuiltinTool::from_name(tool).is_some() {
        return tool.to_string();
    }

    let is_aggregator = aggregators.iter().any(|a| a.eq_ignore_ascii_case(source));
    if is_aggregator {
        if let Some((prefix, _)) = tool.split_once(GROUP_SEPARATOR) {
            if !prefix.is_empty() {
                return prefix.to_lowercase();
            }
        }
    }

    source.to_lowercase()
}

/// One line of the group listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub label: String,
    pub count: usize,
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregators() -> Vec<String> {
        vec!["composio".to_string()]
    }

    #[test]
    fn test_builtins_are_singletons() {
        assert_eq!(group_for("run_command", "anything", &aggregators()), "run_command");
        assert_eq!(group_for("manage_tools", "composio", &aggregators()), "manage_tools");
    }

    #[test]
    fn test_aggregator_tools_group_by_prefix() {
        assert_eq!(
            group_for("GITHUB_CREATE_ISSUE", "composio", &aggregators()),
            "github"
        );
        assert_eq!(
            group_for("slack_send_message", "Composio", &aggregators()),
            "slack"
        );
    }

    #[test]
    fn test_aggregator_tool_without_separator_uses_source() {
        assert_eq!(group_for("ping", "composio", &aggregators()), "composio");
        assert_eq!(group_for("_hidden", "composio", &aggregators()), "composio");
    }

    #[test]
    fn test_plain_source_groups_by_source_name() {
        assert_eq!(group_for("read_file", "Filesystem", &aggregators()), "filesystem");
        assert_eq!(group_for("git_log", "git", &[]), "git");
    }
}
