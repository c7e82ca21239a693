// ABOUTME: ToolCatalog - the registry plus preferences and limits, i.e. everything
// ABOUTME: that decides which tools the model sees and how the user changes that.

use std::path::PathBuf;

use tracing::{info, warn};

use super::{
    apply_group_ceiling, group_for, group_sizes, search, ActiveTools, GroupSummary, Preferences,
    Registry, SearchHit, ToolEntry,
};
use crate::agent::BuiltinTool;
use crate::config::ToolsConfig;
use crate::error::ToolError;

/// Outcome of picking individual tools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickOutcome {
    pub added: Vec<String>,
    pub already_picked: Vec<String>,
    pub unknown: Vec<String>,
}

/// Registry, preferences, and the limits that govern the active tool set.
pub struct ToolCatalog {
    registry: Registry,
    prefs: Preferences,
    prefs_path: Option<PathBuf>,
    settings: ToolsConfig,
}

impl ToolCatalog {
    /// Build a catalog whose preferences live at `prefs_path`.
    pub fn new(registry: Registry, prefs_path: Option<PathBuf>, settings: ToolsConfig) -> Self {
        let prefs = prefs_path
            .as_deref()
            .map(Preferences::load)
            .unwrap_or_default();
        Self {
            registry,
            prefs,
            prefs_path,
            settings,
        }
    }

    /// Build a catalog with in-memory preferences that are never written.
    pub fn in_memory(registry: Registry, prefs: Preferences, settings: ToolsConfig) -> Self {
        Self {
            registry,
            prefs,
            prefs_path: None,
            settings,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn settings(&self) -> &ToolsConfig {
        &self.settings
    }

    fn persist(&self) -> Result<(), ToolError> {
        if let Some(path) = &self.prefs_path {
            self.prefs.save(path)?;
        }
        Ok(())
    }

    /// Registered tools with their groups, in registration order.
    pub async fn registered_entries(&self) -> Vec<ToolEntry> {
        self.registry
            .tools()
            .await
            .into_iter()
            .map(|tool| ToolEntry {
                group: group_for(tool.name(), &tool.source, &self.settings.aggregators),
                definition: tool.to_definition(),
            })
            .collect()
    }

    /// Every tool the model could be offered: built-ins first, then registry order.
    pub async fn entries(&self) -> Vec<ToolEntry> {
        let mut entries: Vec<ToolEntry> = BuiltinTool::ALL
            .iter()
            .map(|b| ToolEntry {
                definition: b.definition(),
                group: b.name().to_string(),
            })
            .collect();
        entries.extend(self.registered_entries().await);
        entries
    }

    /// Disable oversized groups the user has not explicitly enabled.
    /// Persists and returns the labels if any were disabled.
    pub async fn apply_startup_ceiling(&mut self) -> Result<Vec<String>, ToolError> {
        let entries = self.entries().await;
        let disabled =
            apply_group_ceiling(&entries, &mut self.prefs, self.settings.max_group_size);
        if !disabled.is_empty() {
            warn!(
                groups = ?disabled,
                max = self.settings.max_group_size,
                "auto-disabled oversized tool groups"
            );
            self.persist()?;
        }
        Ok(disabled)
    }

    /// Label, size, and enabled flag of every group, sorted by label.
    pub async fn group_summaries(&self) -> Vec<GroupSummary> {
        group_sizes(&self.entries().await)
            .into_iter()
            .map(|(label, count)| GroupSummary {
                enabled: !self.prefs.is_group_disabled(&label),
                label,
                count,
            })
            .collect()
    }

    async fn known_group(&self, label: &str) -> Result<String, ToolError> {
        let label = label.trim().to_lowercase();
        let exists = self.entries().await.iter().any(|e| e.group == label);
        if exists {
            Ok(label)
        } else {
            Err(ToolError::NotFound(format!("group '{}'", label)))
        }
    }

    /// Explicitly enable a group. Returns whether preferences changed.
    pub async fn enable_group(&mut self, label: &str) -> Result<bool, ToolError> {
        let label = self.known_group(label).await?;
        let changed = self.prefs.enable_group(&label);
        info!(group = %label, "enabled tool group");
        self.persist()?;
        Ok(changed)
    }

    /// Disable a group. Returns whether preferences changed.
    pub async fn disable_group(&mut self, label: &str) -> Result<bool, ToolError> {
        let label = self.known_group(label).await?;
        let changed = self.prefs.disable_group(&label);
        info!(group = %label, "disabled tool group");
        self.persist()?;
        Ok(changed)
    }

    /// Add registered tools to the picked set; names that are not registered
    /// are reported back untouched.
    pub async fn pick_tools(&mut self, names: &[String]) -> Result<PickOutcome, ToolError> {
        let mut outcome = PickOutcome::default();
        for name in names {
            if !self.registry.contains(name).await {
                outcome.unknown.push(name.clone());
            } else if self.prefs.pick(name) {
                outcome.added.push(name.clone());
            } else {
                outcome.already_picked.push(name.clone());
            }
        }
        if !outcome.added.is_empty() {
            info!(tools = ?outcome.added, "picked tools");
            self.persist()?;
        }
        Ok(outcome)
    }

    /// Ranked keyword search over registered tools.
    pub async fn search(&self, query: &str) -> Vec<SearchHit> {
        search(
            &self.registered_entries().await,
            &self.prefs,
            query,
            self.settings.search_limit,
        )
    }

    /// The tool set to offer the model.
    pub async fn active(&self) -> ActiveTools {
        ActiveTools::compute(
            &self.entries().await,
            &self.prefs,
            self.settings.max_active_tools,
        )
    }

    /// Swap in a freshly built registry, closing the old one's sources.
    pub async fn replace_registry(&mut self, registry: Registry) {
        let old = std::mem::replace(&mut self.registry, registry);
        old.close_all().await;
    }
}
