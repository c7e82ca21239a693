// ABOUTME: The manage_tools pseudo-tool - lets the model list, toggle, search, and
// ABOUTME: activate tools. Changes persist and flag the active set for recomputation.

use anyhow::{anyhow, bail};
use serde_json::{Map, Value};

use super::TurnContext;
use crate::error::ToolError;
use crate::tool::ToolCatalog;

const ACTIONS: &str = "list_groups, enable_group, disable_group, search, activate";

fn string_arg<'a>(args: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Tool names from `tools`, accepting an array or a comma-separated string.
fn tool_names(args: &Map<String, Value>) -> Vec<String> {
    match args.get("tools") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Handle one `manage_tools` call.
pub async fn manage_tools(
    args: &Map<String, Value>,
    catalog: &mut ToolCatalog,
    ctx: &mut TurnContext,
) -> Result<String, anyhow::Error> {
    let action = string_arg(args, "action")
        .ok_or_else(|| anyhow!("missing required argument 'action' (one of: {})", ACTIONS))?;

    match action {
        "list_groups" => {
            let lines: Vec<String> = catalog
                .group_summaries()
                .await
                .into_iter()
                .map(|g| {
                    format!(
                        "{} ({} tool{}, {})",
                        g.label,
                        g.count,
                        if g.count == 1 { "" } else { "s" },
                        if g.enabled { "enabled" } else { "disabled" }
                    )
                })
                .collect();
            Ok(lines.join("\n"))
        }

        "enable_group" | "disable_group" => {
            let group = string_arg(args, "group")
                .ok_or_else(|| anyhow!("missing required argument 'group'"))?;
            let enable = action == "enable_group";
            let outcome = if enable {
                catalog.enable_group(group).await
            } else {
                catalog.disable_group(group).await
            };
            match outcome {
                Ok(_) => {
                    ctx.tools_changed = true;
                    Ok(format!(
                        "{} group '{}'.",
                        if enable { "Enabled" } else { "Disabled" },
                        group.to_lowercase()
                    ))
                }
                Err(ToolError::NotFound(_)) => {
                    bail!("unknown group '{}'; nothing changed", group)
                }
                Err(e) => Err(e.into()),
            }
        }

        "search" => {
            let query = string_arg(args, "query")
                .ok_or_else(|| anyhow!("missing required argument 'query'"))?;
            let hits = catalog.search(query).await;
            if hits.is_empty() {
                return Ok(format!("No tools match '{}'.", query));
            }
            let lines: Vec<String> = hits
                .into_iter()
                .map(|h| {
                    let status = if h.active { "active" } else { "inactive" };
                    if h.description.is_empty() {
                        format!("{} [{}, {}]", h.name, h.group, status)
                    } else {
                        format!("{} [{}, {}]: {}", h.name, h.group, status, h.description)
                    }
                })
                .collect();
            Ok(lines.join("\n"))
        }

        "activate" => {
            let names = tool_names(args);
            if names.is_empty() {
                bail!("missing required argument 'tools'");
            }
            let outcome = catalog.pick_tools(&names).await?;
            if !outcome.added.is_empty() {
                ctx.tools_changed = true;
            }

            let mut parts = Vec::new();
            if !outcome.added.is_empty() {
                parts.push(format!("Activated: {}.", outcome.added.join(", ")));
            }
            if !outcome.already_picked.is_empty() {
                parts.push(format!(
                    "Already active: {}.",
                    outcome.already_picked.join(", ")
                ));
            }
            if !outcome.unknown.is_empty() {
                parts.push(format!("Unknown tools: {}.", outcome.unknown.join(", ")));
            }
            Ok(parts.join(" "))
        }

        other => bail!("unknown action '{}' (one of: {})", other, ACTIONS),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ToolsConfig;
    use crate::tool::registry_test::MockSource;
    use crate::tool::{Preferences, Registry, ToolSource};

    async fn catalog() -> ToolCatalog {
        let sources: Vec<Arc<dyn ToolSource>> = vec![MockSource::new(
            "composio",
            &["GMAIL_SEND_EMAIL", "GMAIL_LIST_THREADS", "NOTION_CREATE_PAGE"],
        )];
        let mut prefs = Preferences::default();
        prefs.disable_group("gmail");
        ToolCatalog::in_memory(
            Registry::from_sources(sources).await,
            prefs,
            ToolsConfig::default(),
        )
    }

    fn args(value: serde_json::Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_list_groups() {
        let mut catalog = catalog().await;
        let mut ctx = TurnContext::default();

        let out = manage_tools(&args(serde_json::json!({"action": "list_groups"})), &mut catalog, &mut ctx)
            .await
            .unwrap();

        assert!(out.contains("gmail (2 tools, disabled)"));
        assert!(out.contains("notion (1 tool, enabled)"));
        assert!(out.contains("run_command (1 tool, enabled)"));
        assert!(!ctx.tools_changed);
    }

    #[tokio::test]
    async fn test_enable_group_sets_flag() {
        let mut catalog = catalog().await;
        let mut ctx = TurnContext::default();

        let out = manage_tools(
            &args(serde_json::json!({"action": "enable_group", "group": "Gmail"})),
            &mut catalog,
            &mut ctx,
        )
        .await
        .unwrap();

        assert_eq!(out, "Enabled group 'gmail'.");
        assert!(ctx.tools_changed);
        assert!(!catalog.preferences().is_group_disabled("gmail"));
    }

    #[tokio::test]
    async fn test_unknown_group_is_error_and_leaves_flag() {
        let mut catalog = catalog().await;
        let mut ctx = TurnContext::default();

        let err = manage_tools(
            &args(serde_json::json!({"action": "disable_group", "group": "jira"})),
            &mut catalog,
            &mut ctx,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("nothing changed"));
        assert!(!ctx.tools_changed);
    }

    #[tokio::test]
    async fn test_search_lists_inactive_hits_first() {
        let mut catalog = catalog().await;
        let mut ctx = TurnContext::default();

        let out = manage_tools(
            &args(serde_json::json!({"action": "search", "query": "create send"})),
            &mut catalog,
            &mut ctx,
        )
        .await
        .unwrap();

        let first = out.lines().next().unwrap();
        assert!(first.starts_with("GMAIL_SEND_EMAIL [gmail, inactive]"));
        assert!(out.contains("NOTION_CREATE_PAGE [notion, active]"));
    }

    #[tokio::test]
    async fn test_activate_accepts_string_list() {
        let mut catalog = catalog().await;
        let mut ctx = TurnContext::default();

        let out = manage_tools(
            &args(serde_json::json!({"action": "activate", "tools": "GMAIL_SEND_EMAIL, NOPE"})),
            &mut catalog,
            &mut ctx,
        )
        .await
        .unwrap();

        assert_eq!(out, "Activated: GMAIL_SEND_EMAIL. Unknown tools: NOPE.");
        assert!(ctx.tools_changed);
        assert!(catalog.active().await.contains("GMAIL_SEND_EMAIL"));
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let mut catalog = catalog().await;
        let mut ctx = TurnContext::default();

        let err = manage_tools(&args(serde_json::json!({"action": "explode"})), &mut catalog, &mut ctx)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unknown action 'explode'"));
    }
}
