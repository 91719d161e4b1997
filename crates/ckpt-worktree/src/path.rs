//! Workspace-relative path handling.
//!
//! Every path the checkpoint store records is relative to the workspace root,
//! `/`-separated and free of `.`/`..` components.

use std::path::{Component, Path, PathBuf};

use crate::error::{WorktreeError, WorktreeResult};

/// Turn a user-supplied path into a workspace-relative key.
///
/// Absolute paths must lie inside `root`. Relative paths are taken as
/// relative to `root`. `.` components are dropped; `..` is rejected.
pub fn normalize_path(root: &Path, input: &Path) -> WorktreeResult<String> {
    let display = input.display().to_string();
    let relative = if input.is_absolute() {
        input
            .strip_prefix(root)
            .map_err(|_| WorktreeError::invalid_path(&display, "outside the workspace"))?
    } else {
        input
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name
                    .to_str()
                    .ok_or_else(|| WorktreeError::invalid_path(&display, "not valid UTF-8"))?;
                parts.push(name);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(WorktreeError::invalid_path(&display, "contains `..`"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(WorktreeError::invalid_path(&display, "outside the workspace"));
            }
        }
    }

    if parts.is_empty() {
        return Err(WorktreeError::invalid_path(&display, "names the workspace root"));
    }
    Ok(parts.join("/"))
}

/// Resolve a workspace-relative key to a path under `root`.
pub fn resolve(root: &Path, key: &str) -> PathBuf {
    key.split('/').fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// Check that a single tree entry name is safe to materialize.
pub(crate) fn validate_name(name: &str) -> WorktreeResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(WorktreeError::invalid_path(name, "not a single path segment"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> PathBuf {
        if cfg!(windows) {
            PathBuf::from(r"C:\work\proj")
        } else {
            PathBuf::from("/work/proj")
        }
    }

    #[test]
    fn relative_paths_pass_through() {
        assert_eq!(normalize_path(&root(), Path::new("notes.txt")).unwrap(), "notes.txt");
        assert_eq!(
            normalize_path(&root(), Path::new("./src/lib.rs")).unwrap(),
            "src/lib.rs"
        );
    }

    #[test]
    fn absolute_paths_inside_root_are_relativized() {
        let abs = root().join("src").join("main.rs");
        assert_eq!(normalize_path(&root(), &abs).unwrap(), "src/main.rs");
    }

    #[test]
    fn absolute_paths_outside_root_are_rejected() {
        let outside = root().parent().unwrap().join("other").join("x.txt");
        assert!(matches!(
            normalize_path(&root(), &outside),
            Err(WorktreeError::InvalidPath { .. })
        ));
    }

    #[test]
    fn parent_components_are_rejected() {
        assert!(normalize_path(&root(), Path::new("../escape.txt")).is_err());
        assert!(normalize_path(&root(), Path::new("a/../../b")).is_err());
    }

    #[test]
    fn root_itself_is_rejected() {
        assert!(normalize_path(&root(), Path::new(".")).is_err());
        assert!(normalize_path(&root(), &root()).is_err());
    }

    #[test]
    fn resolve_joins_segments() {
        assert_eq!(resolve(&root(), "a/b/c.txt"), root().join("a").join("b").join("c.txt"));
    }

    #[test]
    fn validate_name_rejects_traversal() {
        assert!(validate_name("ok.txt").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b"] {
            assert!(validate_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
