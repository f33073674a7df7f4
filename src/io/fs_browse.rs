//! Attachment browsing, confined to a per-project root directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("no attachment root configured for this project")]
    NoRoot,
    #[error("root is not a directory: {0}")]
    RootNotDirectory(PathBuf),
    #[error("path escapes root: {0}")]
    EscapesRoot(PathBuf),
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A directory listing row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    /// Path relative to the root
    pub rel_path: String,
    pub is_dir: bool,
}

/// Resolve `.` and `..` lexically. Leading `..` on a relative path are kept
/// so a later prefix check catches them.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = Vec::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

fn check_root(root: &str) -> Result<PathBuf, FsError> {
    let root = root.trim();
    if root.is_empty() {
        return Err(FsError::NoRoot);
    }
    let root = std::path::absolute(root).map_err(|e| FsError::Io {
        path: PathBuf::from(root),
        source: e,
    })?;
    let root = clean_path(&root);
    if !root.is_dir() {
        return Err(FsError::RootNotDirectory(root));
    }
    Ok(root)
}

/// Normalize `candidate` (absolute, or relative to `root`) and require it to
/// stay inside `root`. Returns the cleaned absolute path.
pub fn resolve_within_root(root: &str, candidate: &str) -> Result<PathBuf, FsError> {
    let root = check_root(root)?;
    let candidate = Path::new(candidate.trim());
    let joined = if candidate.is_absolute() {
        clean_path(candidate)
    } else {
        clean_path(&root.join(candidate))
    };
    if !joined.starts_with(&root) {
        return Err(FsError::EscapesRoot(joined));
    }
    Ok(joined)
}

/// Lexical form of `rel` if it stays below the root. Touches no files.
pub fn confine_relative(rel: &str) -> Result<String, FsError> {
    let cleaned = clean_path(Path::new(rel.trim()));
    let escapes = cleaned.has_root()
        || matches!(
            cleaned.components().next(),
            Some(Component::ParentDir) | Some(Component::Prefix(_))
        );
    if escapes {
        return Err(FsError::EscapesRoot(cleaned));
    }
    Ok(cleaned.to_string_lossy().replace('\\', "/"))
}

/// Path of `abs` relative to `root`, `"."` for the root itself.
pub fn relative_to_root(root: &Path, abs: &Path) -> String {
    match abs.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => abs.to_string_lossy().to_string(),
    }
}

/// List `dir` (relative to `root`): directories first, then files, each
/// sorted by name.
pub fn list_dir(root: &str, dir: &str) -> Result<Vec<DirEntry>, FsError> {
    let root_path = check_root(root)?;
    let target = resolve_within_root(root, dir)?;
    let read = fs::read_dir(&target).map_err(|e| FsError::Io {
        path: target.clone(),
        source: e,
    })?;

    let mut entries = Vec::new();
    for entry in read.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let path = entry.path();
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            rel_path: relative_to_root(&root_path, &path),
            is_dir,
        });
    }
    entries.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("docs/specs")).unwrap();
        fs::write(tmp.path().join("README.md"), "hi").unwrap();
        fs::write(tmp.path().join("docs/a.md"), "a").unwrap();
        tmp
    }

    #[test]
    fn clean_path_collapses_dots() {
        assert_eq!(clean_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean_path(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(clean_path(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(clean_path(Path::new("a/..")), PathBuf::from("."));
    }

    #[test]
    fn inside_root_is_accepted() {
        let tmp = fixture();
        let root = tmp.path().to_string_lossy().to_string();
        let p = resolve_within_root(&root, "docs/./specs/../a.md").unwrap();
        assert_eq!(p, tmp.path().join("docs/a.md"));
    }

    #[test]
    fn escapes_are_rejected() {
        let tmp = fixture();
        let root = tmp.path().to_string_lossy().to_string();
        assert!(matches!(
            resolve_within_root(&root, "../outside"),
            Err(FsError::EscapesRoot(_))
        ));
        assert!(matches!(
            resolve_within_root(&root, "/etc/passwd"),
            Err(FsError::EscapesRoot(_))
        ));
    }

    #[test]
    fn empty_or_file_root_fails() {
        let tmp = fixture();
        assert!(matches!(resolve_within_root("  ", "a"), Err(FsError::NoRoot)));
        let file_root = tmp.path().join("README.md").to_string_lossy().to_string();
        assert!(matches!(
            resolve_within_root(&file_root, "a"),
            Err(FsError::RootNotDirectory(_))
        ));
    }

    #[test]
    fn relative_root_is_made_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let p = resolve_within_root(".", "Cargo.toml").unwrap();
        assert_eq!(p, cwd.join("Cargo.toml"));
        let p = resolve_within_root("./src", "io/../main.rs").unwrap();
        assert_eq!(p, cwd.join("src/main.rs"));
        let names: Vec<String> = list_dir(".", "src")
            .unwrap()
            .into_iter()
            .map(|e| e.rel_path)
            .collect();
        assert!(names.contains(&"src/main.rs".to_string()));
    }

    #[test]
    fn confine_relative_is_lexical() {
        assert_eq!(confine_relative("docs/./a.md").unwrap(), "docs/a.md");
        assert_eq!(confine_relative("docs/../a.md").unwrap(), "a.md");
        assert!(matches!(
            confine_relative("docs/../../a.md"),
            Err(FsError::EscapesRoot(_))
        ));
        assert!(matches!(
            confine_relative("/etc/passwd"),
            Err(FsError::EscapesRoot(_))
        ));
    }

    #[test]
    fn listing_puts_directories_first() {
        let tmp = fixture();
        let root = tmp.path().to_string_lossy().to_string();
        let names: Vec<(String, bool)> = list_dir(&root, ".")
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.is_dir))
            .collect();
        assert_eq!(
            names,
            vec![("docs".to_string(), true), ("README.md".to_string(), false)]
        );
        let docs = list_dir(&root, "docs").unwrap();
        assert_eq!(docs[0].rel_path, "docs/specs");
        assert_eq!(docs[1].rel_path, "docs/a.md");
    }
}
