use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Client configuration from config.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub confirm: ConfirmConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Author name for comments. Empty means bootstrap has not run.
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_highlight")]
    pub highlight_color: String,
    /// Leave the mouse to the terminal so native text selection works.
    #[serde(default)]
    pub mouse_selection_mode: bool,
    #[serde(default)]
    pub show_archived: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            highlight_color: default_highlight(),
            mouse_selection_mode: false,
            show_archived: false,
        }
    }
}

fn default_highlight() -> String {
    "cyan".to_string()
}

fn default_true() -> bool {
    true
}

/// Which mutating actions ask for confirmation first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmConfig {
    #[serde(default = "default_true")]
    pub archive: bool,
    #[serde(default)]
    pub restore: bool,
    #[serde(default = "default_true")]
    pub hard_delete: bool,
    #[serde(default = "default_true")]
    pub delete_project: bool,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        ConfirmConfig {
            archive: true,
            restore: false,
            hard_delete: true,
            delete_project: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelsConfig {
    #[serde(default)]
    pub global: Vec<String>,
    /// Reject labels outside the merged allow-list on submit.
    #[serde(default)]
    pub enforce_allowed: bool,
    /// Per-project labels keyed by project slug
    #[serde(default)]
    pub projects: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Attachment root directories keyed by project slug
    #[serde(default)]
    pub roots: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub cross_project: bool,
    #[serde(default)]
    pub include_archived: bool,
    /// Lifecycle state ids enabled by default in search and the dependency inspector
    #[serde(default = "default_states")]
    pub states: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            cross_project: false,
            include_archived: false,
            states: default_states(),
        }
    }
}

fn default_states() -> Vec<String> {
    vec!["todo".into(), "progress".into(), "done".into()]
}

impl Config {
    /// Bootstrap is mandatory until a display name has been recorded.
    pub fn needs_bootstrap(&self) -> bool {
        self.identity.display_name.trim().is_empty()
    }

    pub fn project_labels(&self, slug: &str) -> &[String] {
        self.labels
            .projects
            .get(slug)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Attachment root for a project, if one is configured and non-empty.
    pub fn project_root(&self, slug: &str) -> Option<&str> {
        self.paths
            .roots
            .get(slug)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.needs_bootstrap());
        assert_eq!(config.ui.highlight_color, "cyan");
        assert!(config.confirm.archive);
        assert!(!config.confirm.restore);
        assert_eq!(config.search.states, vec!["todo", "progress", "done"]);
    }

    #[test]
    fn per_project_lookups() {
        let config: Config = toml::from_str(
            r#"
[identity]
display_name = "sam"

[labels]
global = ["bug"]

[labels.projects]
web = ["frontend", "css"]

[paths.roots]
web = "/srv/web"
api = "  "
"#,
        )
        .unwrap();
        assert!(!config.needs_bootstrap());
        assert_eq!(config.project_labels("web"), ["frontend", "css"]);
        assert!(config.project_labels("api").is_empty());
        assert_eq!(config.project_root("web"), Some("/srv/web"));
        assert_eq!(config.project_root("api"), None);
        assert_eq!(config.project_root("missing"), None);
    }
}
