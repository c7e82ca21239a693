// ABOUTME: Keyword search over registered tools for the manage_tools pseudo-tool.
// ABOUTME: Scores name and description hits, boosting tools hidden by a disabled group.

use std::sync::LazyLock;

use regex::Regex;

use super::{is_active, Preferences, ToolEntry};

const NAME_HIT: u32 = 3;
const DESCRIPTION_HIT: u32 = 1;
const DISABLED_GROUP_BONUS: u32 = 2;

static TERM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("valid regex"));

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub name: String,
    pub group: String,
    pub description: String,
    pub score: u32,
    /// Whether the model can already see this tool.
    pub active: bool,
}

/// Lower-cased alphanumeric terms of a query.
pub fn terms(query: &str) -> Vec<String> {
    let lowered = query.to_lowercase();
    TERM.find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Rank `entries` against `query`, best first, ties broken by name.
///
/// Hidden tools get a bonus: search exists mostly to find tools the user
/// cannot currently reach.
pub fn search(
    entries: &[ToolEntry],
    prefs: &Preferences,
    query: &str,
    limit: usize,
) -> Vec<SearchHit> {
    let terms = terms(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = entries
        .iter()
        .filter_map(|entry| {
            let name = entry.name().to_lowercase();
            let description = entry.definition.description.to_lowercase();

            let mut score = 0;
            for term in &terms {
                if name.contains(term.as_str()) {
                    score += NAME_HIT;
                }
                if description.contains(term.as_str()) {
                    score += DESCRIPTION_HIT;
                }
            }
            if score == 0 {
                return None;
            }
            if prefs.is_group_disabled(&entry.group) {
                score += DISABLED_GROUP_BONUS;
            }

            Some(SearchHit {
                name: entry.name().to_string(),
                group: entry.group.clone(),
                description: entry.definition.description.clone(),
                score,
                active: is_active(entry, prefs),
            })
        })
        .collect();

    hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    hits.truncate(limit);
    hits
}
