//! Source and destination checks run before every extraction.

use crate::error::ExtractError;
use std::path::Path;

/// Verify that `source` exists and make sure `destination` is a directory.
///
/// The source check comes first, so a missing source never creates the
/// destination. Missing ancestors of `destination` are created as well.
pub async fn validate_paths(source: &Path, destination: &Path) -> Result<(), ExtractError> {
    if !tokio::fs::try_exists(source).await? {
        return Err(ExtractError::NotFound(source.to_path_buf()));
    }

    tokio::fs::create_dir_all(destination).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_source_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out");

        let result = validate_paths(&temp_dir.path().join("missing.zip"), &dest).await;

        assert!(matches!(result, Err(ExtractError::NotFound(_))));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_creates_nested_destination() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.zip");
        std::fs::write(&source, b"x").unwrap();
        let dest = temp_dir.path().join("a/b/c");

        validate_paths(&source, &dest).await.unwrap();
        assert!(dest.is_dir());

        // Existing destination is fine
        validate_paths(&source, &dest).await.unwrap();
    }

    #[tokio::test]
    async fn test_unreadable_source_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let dest = temp_dir.path().join("out");

        // A regular file used as a directory fails the lookup with ENOTDIR
        let result = validate_paths(&blocker.join("a.zip"), &dest).await;

        #[cfg(unix)]
        assert!(matches!(result, Err(ExtractError::Io(_))));
        #[cfg(not(unix))]
        assert!(result.is_err());
        assert!(!dest.exists());
    }
}
