// ABOUTME: Persisted tool preferences - disabled groups, picked tools, enabled groups.
// ABOUTME: Stored as JSON and replaced atomically via a unique temp file and rename.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Environment variable overriding the preferences file location.
pub const PREFS_ENV: &str = "CONCH_TOOLS_PREFS";

/// User choices about which tools the model sees.
///
/// All three lists keep insertion order and never hold duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Group labels whose tools are hidden.
    pub disabled_groups: Vec<String>,
    /// Tool names shown even when their group is disabled.
    pub picked_tools: Vec<String>,
    /// Group labels the user enabled explicitly; exempt from the size ceiling.
    pub enabled_groups: Vec<String>,
}

fn push_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_string());
    true
}

fn remove(list: &mut Vec<String>, value: &str) -> bool {
    let before = list.len();
    list.retain(|v| v != value);
    list.len() != before
}

impl Preferences {
    /// Default location: `$CONCH_TOOLS_PREFS`, else `$XDG_CONFIG_HOME/conch/tools.json`.
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(PREFS_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        crate::config::conch_dir().map(|d| d.join("tools.json"))
    }

    /// Load preferences. A missing or unreadable file yields defaults.
    pub fn load(path: &Path) -> Self {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read tool preferences");
                return Self::default();
            }
        };

        match serde_json::from_str::<Self>(&data) {
            Ok(mut prefs) => {
                prefs.dedup();
                prefs
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed tool preferences");
                Self::default()
            }
        }
    }

    /// Write preferences to a uniquely named temp file beside `path`, then
    /// rename it over `path`. Concurrent writers never share a temp file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let data = serde_json::to_vec_pretty(self)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        debug!(path = %path.display(), "saved tool preferences");
        Ok(())
    }

    fn dedup(&mut self) {
        for list in [
            &mut self.disabled_groups,
            &mut self.picked_tools,
            &mut self.enabled_groups,
        ] {
            let mut seen = Vec::with_capacity(list.len());
            list.retain(|v| {
                if seen.contains(v) {
                    false
                } else {
                    seen.push(v.clone());
                    true
                }
            });
        }
    }

    pub fn is_group_disabled(&self, label: &str) -> bool {
        self.disabled_groups.iter().any(|g| g == label)
    }

    pub fn is_group_pinned(&self, label: &str) -> bool {
        self.enabled_groups.iter().any(|g| g == label)
    }

    pub fn is_picked(&self, name: &str) -> bool {
        self.picked_tools.iter().any(|t| t == name)
    }

    /// Explicitly enable a group. Returns whether anything changed.
    pub fn enable_group(&mut self, label: &str) -> bool {
        let undisabled = remove(&mut self.disabled_groups, label);
        let pinned = push_unique(&mut self.enabled_groups, label);
        undisabled || pinned
    }

    /// Disable a group and drop any explicit enable. Returns whether anything changed.
    pub fn disable_group(&mut self, label: &str) -> bool {
        let unpinned = remove(&mut self.enabled_groups, label);
        let disabled = push_unique(&mut self.disabled_groups, label);
        unpinned || disabled
    }

    /// Disable a group on behalf of the size ceiling. Never touches explicit enables.
    pub(crate) fn auto_disable(&mut self, label: &str) -> bool {
        push_unique(&mut self.disabled_groups, label)
    }

    /// Add a tool to the picked set. Returns whether it was new.
    pub fn pick(&mut self, name: &str) -> bool {
        push_unique(&mut self.picked_tools, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load(&dir.path().join("nope.json"));
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_malformed_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(Preferences::load(&path), Preferences::default());
    }

    #[test]
    fn test_save_creates_dirs_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conch").join("tools.json");

        let mut prefs = Preferences::default();
        prefs.disable_group("github");
        prefs.pick("GITHUB_CREATE_ISSUE");
        prefs.save(&path).unwrap();

        assert_eq!(Preferences::load(&path), prefs);
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("tools.json")]);
    }

    #[test]
    fn test_concurrent_saves_never_tear_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    let mut prefs = Preferences::default();
                    prefs.disable_group(&format!("group-{}", i));
                    for _ in 0..25 {
                        prefs.save(&path).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        // The survivor is one writer's complete document.
        let raw = fs::read_to_string(&path).unwrap();
        let saved: Preferences = serde_json::from_str(&raw).unwrap();
        assert_eq!(saved.disabled_groups.len(), 1);
        assert!(saved.disabled_groups[0].starts_with("group-"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_partial_file_fills_defaults_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.json");
        fs::write(&path, r#"{"disabled_groups": ["slack", "slack", "jira"]}"#).unwrap();

        let prefs = Preferences::load(&path);

        assert_eq!(prefs.disabled_groups, vec!["slack", "jira"]);
        assert!(prefs.picked_tools.is_empty());
    }

    #[test]
    fn test_enable_and_disable_are_inverse() {
        let mut prefs = Preferences::default();

        assert!(prefs.disable_group("github"));
        assert!(!prefs.disable_group("github"));
        assert!(prefs.is_group_disabled("github"));

        assert!(prefs.enable_group("github"));
        assert!(!prefs.is_group_disabled("github"));
        assert!(prefs.is_group_pinned("github"));

        assert!(prefs.disable_group("github"));
        assert!(!prefs.is_group_pinned("github"));
    }

    #[test]
    fn test_auto_disable_leaves_pins_alone() {
        let mut prefs = Preferences::default();
        prefs.enable_group("big");
        prefs.auto_disable("big");
        assert!(prefs.is_group_pinned("big"));
    }

    #[test]
    fn test_pick_is_deduplicated() {
        let mut prefs = Preferences::default();
        assert!(prefs.pick("a"));
        assert!(!prefs.pick("a"));
        assert_eq!(prefs.picked_tools, vec!["a"]);
    }
}
