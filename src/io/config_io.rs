use std::fs;
use std::path::{Path, PathBuf};

use toml_edit::{DocumentMut, Item, Table};

use crate::io::atomic::atomic_write;
use crate::model::Config;

/// Error type for config reads and writes
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not parse config: {0}")]
    Document(#[from] toml_edit::TomlError),
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// `~/.config/arbor/config.toml`, falling back to the working directory
/// when no config dir is known.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("arbor")
        .join("config.toml")
}

/// Read the config, returning both the parsed config and the raw toml_edit
/// document for round-trip-safe editing. A missing file yields defaults.
pub fn read_config(path: &Path) -> Result<(Config, DocumentMut), ConfigError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };
    let config: Config = toml::from_str(&text)?;
    let doc: DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Write the document back to disk, preserving formatting.
pub fn write_config(path: &Path, doc: &DocumentMut) -> Result<(), ConfigError> {
    atomic_write(path, doc.to_string().as_bytes()).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// One settings change made from the TUI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEdit {
    DisplayName(String),
    HighlightColor(String),
    MouseSelection(bool),
    GlobalLabels(Vec<String>),
    ProjectLabels { slug: String, labels: Vec<String> },
    /// `None` or an empty path removes the root
    ProjectRoot { slug: String, root: Option<String> },
}

impl ConfigEdit {
    pub fn describe(&self) -> String {
        match self {
            ConfigEdit::DisplayName(_) => "display name".to_string(),
            ConfigEdit::HighlightColor(c) => format!("highlight color {}", c),
            ConfigEdit::MouseSelection(on) => {
                format!("mouse selection {}", if *on { "on" } else { "off" })
            }
            ConfigEdit::GlobalLabels(_) => "global labels".to_string(),
            ConfigEdit::ProjectLabels { slug, .. } => format!("labels for {}", slug),
            ConfigEdit::ProjectRoot { slug, .. } => format!("root for {}", slug),
        }
    }
}

/// Make `key` in `parent` a standard table, creating it or converting an
/// inline table.
fn ensure_table(parent: &mut Table, key: &str, implicit: bool) {
    let item = parent.entry(key).or_insert(Item::None);
    if !item.is_table() {
        let mut table = std::mem::take(item).into_table().unwrap_or_default();
        table.set_implicit(implicit);
        *item = Item::Table(table);
    }
}

fn string_array(items: &[String]) -> Item {
    let array: toml_edit::Array = items.iter().map(|s| s.as_str()).collect();
    toml_edit::value(array)
}

pub fn apply_edit(doc: &mut DocumentMut, edit: &ConfigEdit) {
    let root = doc.as_table_mut();
    match edit {
        ConfigEdit::DisplayName(name) => {
            ensure_table(root, "identity", false);
            root["identity"]["display_name"] = toml_edit::value(name.trim());
        }
        ConfigEdit::HighlightColor(color) => {
            ensure_table(root, "ui", false);
            root["ui"]["highlight_color"] = toml_edit::value(color.trim());
        }
        ConfigEdit::MouseSelection(on) => {
            ensure_table(root, "ui", false);
            root["ui"]["mouse_selection_mode"] = toml_edit::value(*on);
        }
        ConfigEdit::GlobalLabels(labels) => {
            ensure_table(root, "labels", false);
            root["labels"]["global"] = string_array(labels);
        }
        ConfigEdit::ProjectLabels { slug, labels } => {
            ensure_table(root, "labels", false);
            if let Some(section) = root["labels"].as_table_mut() {
                ensure_table(section, "projects", false);
                if labels.is_empty() {
                    if let Some(projects) = section["projects"].as_table_mut() {
                        projects.remove(slug);
                    }
                } else {
                    section["projects"][slug.as_str()] = string_array(labels);
                }
            }
        }
        ConfigEdit::ProjectRoot { slug, root: dir } => {
            ensure_table(root, "paths", true);
            if let Some(section) = root["paths"].as_table_mut() {
                ensure_table(section, "roots", false);
                match dir.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
                    Some(d) => section["roots"][slug.as_str()] = toml_edit::value(d),
                    None => {
                        if let Some(roots) = section["roots"].as_table_mut() {
                            roots.remove(slug);
                        }
                    }
                }
            }
        }
    }
}

/// Apply edits to the file at `path` and return the reparsed config.
pub fn save_edits(path: &Path, edits: &[ConfigEdit]) -> Result<Config, ConfigError> {
    let (_, mut doc) = read_config(path)?;
    for edit in edits {
        apply_edit(&mut doc, edit);
    }
    let config: Config = toml::from_str(&doc.to_string())?;
    write_config(path, &doc)?;
    tracing::info!(path = %path.display(), edits = edits.len(), "config written");
    Ok(config)
}
