// ABOUTME: ActiveTools - the filtered set of tool definitions offered to the model.
// ABOUTME: Applies group preferences, picked-tool overrides, and the startup ceilings.

use std::collections::{BTreeMap, HashSet};

use super::Preferences;
use crate::llm::ToolDefinition;

/// A tool as the filters see it: its definition and derived group.
#[derive(Debug, Clone)]
pub struct ToolEntry {
    pub definition: ToolDefinition,
    pub group: String,
}

impl ToolEntry {
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

/// Check if a tool passes the preference filter.
///
/// Picked names always pass; otherwise the tool's group must not be disabled.
pub fn is_active(entry: &ToolEntry, prefs: &Preferences) -> bool {
    prefs.is_picked(entry.name()) || !prefs.is_group_disabled(&entry.group)
}

/// Member count per group label, sorted by label.
pub fn group_sizes(entries: &[ToolEntry]) -> BTreeMap<String, usize> {
    let mut sizes = BTreeMap::new();
    for entry in entries {
        *sizes.entry(entry.group.clone()).or_insert(0) += 1;
    }
    sizes
}

/// Disable every group larger than `max_group_size` unless the user enabled
/// it explicitly. Returns the labels that were newly disabled.
pub fn apply_group_ceiling(
    entries: &[ToolEntry],
    prefs: &mut Preferences,
    max_group_size: usize,
) -> Vec<String> {
    let mut disabled = Vec::new();
    for (label, count) in group_sizes(entries) {
        if count > max_group_size && !prefs.is_group_pinned(&label) && prefs.auto_disable(&label) {
            disabled.push(label);
        }
    }
    disabled
}

/// The tool definitions the model is offered on the next round.
#[derive(Debug, Clone, Default)]
pub struct ActiveTools {
    definitions: Vec<ToolDefinition>,
    names: HashSet<String>,
}

impl ActiveTools {
    /// Filter `entries` (already in priority order) and keep at most
    /// `max_active_tools` of them.
    pub fn compute(entries: &[ToolEntry], prefs: &Preferences, max_active_tools: usize) -> Self {
        let definitions: Vec<ToolDefinition> = entries
            .iter()
            .filter(|e| is_active(e, prefs))
            .take(max_active_tools)
            .map(|e| e.definition.clone())
            .collect();
        let names = definitions.iter().map(|d| d.name.clone()).collect();
        Self { definitions, names }
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
