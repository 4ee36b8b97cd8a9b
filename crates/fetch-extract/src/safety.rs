//! Entry-name checks that keep extracted files inside the destination.

use crate::error::SecurityError;
use std::path::{Component, Path, PathBuf};

/// Normalize an archive entry name into a relative path below the destination.
///
/// Absolute names and any `..` component are rejected; `.` components and
/// repeated separators are dropped.
///
/// ```
/// use std::path::Path;
/// use fetch_extract::safety::sanitize_entry_path;
///
/// assert_eq!(
///     sanitize_entry_path(Path::new("./docs/readme.md")).unwrap(),
///     Path::new("docs/readme.md")
/// );
/// assert!(sanitize_entry_path(Path::new("../../etc/passwd")).is_err());
/// assert!(sanitize_entry_path(Path::new("/etc/passwd")).is_err());
/// ```
pub fn sanitize_entry_path(path: &Path) -> Result<PathBuf, SecurityError> {
    if path.is_absolute() {
        return Err(SecurityError::AbsolutePath(path.display().to_string()));
    }

    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(SecurityError::PathTraversal(path.display().to_string()));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(SecurityError::AbsolutePath(path.display().to_string()));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(SecurityError::PathTraversal(format!(
            "entry '{}' normalizes to an empty path",
            path.display()
        )));
    }

    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_relative_paths() {
        assert_eq!(
            sanitize_entry_path(Path::new("file.txt")).unwrap(),
            Path::new("file.txt")
        );
        assert_eq!(
            sanitize_entry_path(Path::new("dir//sub/./file.txt")).unwrap(),
            Path::new("dir/sub/file.txt")
        );
        assert_eq!(
            sanitize_entry_path(Path::new("nested/dir/")).unwrap(),
            Path::new("nested/dir")
        );
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        for name in ["../evil", "a/../../evil", "./../evil", "dir/.."] {
            assert!(
                matches!(
                    sanitize_entry_path(Path::new(name)),
                    Err(SecurityError::PathTraversal(_))
                ),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_sanitize_rejects_absolute_and_empty() {
        assert!(matches!(
            sanitize_entry_path(Path::new("/tmp/file.txt")),
            Err(SecurityError::AbsolutePath(_))
        ));
        assert!(sanitize_entry_path(Path::new(".")).is_err());
        assert!(sanitize_entry_path(Path::new("")).is_err());
    }
}
