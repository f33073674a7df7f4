use std::collections::HashSet;

use crate::model::{Config, TaskArena};

use super::projection::ancestor_walk;

/// Label sets in inheritance precedence order
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelSources<'a> {
    pub global: &'a [String],
    pub project: &'a [String],
    pub phase: &'a [String],
}

/// Concatenate global, project and phase labels, dropping case-insensitive
/// duplicates. The first occurrence wins, casing included.
pub fn merge_label_sources(sources: LabelSources<'_>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for label in sources
        .global
        .iter()
        .chain(sources.project)
        .chain(sources.phase)
    {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            merged.push(trimmed.to_string());
        }
    }
    merged
}

/// Labels of the nearest phase at or above `start`. Only that one phase
/// contributes; phases further up are ignored.
pub fn nearest_phase_labels(tasks: &TaskArena, start: Option<&str>) -> Vec<String> {
    let start = match start {
        Some(id) => id,
        None => return Vec::new(),
    };
    ancestor_walk(tasks, start)
        .find(|t| t.kind.is_phase_like())
        .map(|t| t.labels.clone())
        .unwrap_or_default()
}

/// Inherited labels for an item whose parent is `parent_id`, in a project
/// with the given slug.
pub fn inherited_labels(
    config: &Config,
    project_slug: &str,
    tasks: &TaskArena,
    parent_id: Option<&str>,
) -> Vec<String> {
    let phase = nearest_phase_labels(tasks, parent_id);
    merge_label_sources(LabelSources {
        global: &config.labels.global,
        project: config.project_labels(project_slug),
        phase: &phase,
    })
}

/// Labels a value may use when the allow-list is enforced. Returns the
/// offending labels.
pub fn disallowed_labels(labels: &[String], allowed: &[String]) -> Vec<String> {
    let allowed: HashSet<String> = allowed.iter().map(|l| l.to_lowercase()).collect();
    labels
        .iter()
        .filter(|l| !allowed.contains(&l.to_lowercase()))
        .cloned()
        .collect()
}
