//! Extension-based container classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Compound suffix checked before the single trailing extension.
pub const TAR_GZ_SUFFIX: &str = ".tar.gz";

/// Extension tokens (without dot) that the facade treats as extractable.
const COMPRESSED_EXTENSIONS: &[&str] = &["zip", "tgz", "gz", "tar"];

/// Archive or compression family of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerKind {
    Zip,
    Gzip,
    Tar,
    TarGzip,
    None,
}

impl ContainerKind {
    /// Maps a single lowercase extension (with leading dot) to its kind.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            ".zip" => ContainerKind::Zip,
            ".tgz" => ContainerKind::TarGzip,
            ".tar" => ContainerKind::Tar,
            ".gz" => ContainerKind::Gzip,
            _ => ContainerKind::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Zip => "ZIP",
            ContainerKind::Gzip => "GZIP",
            ContainerKind::Tar => "TAR",
            ContainerKind::TarGzip => "TAR_GZIP",
            ContainerKind::None => "NONE",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a file name into a [`ContainerKind`].
///
/// The compound `.tar.gz` suffix wins over the plain `.gz` extension, so
/// `backup.TAR.GZ` is [`ContainerKind::TarGzip`] rather than
/// [`ContainerKind::Gzip`].
///
/// # Examples
///
/// ```
/// use fetch_extract::{classify, ContainerKind};
///
/// assert_eq!(classify("site.tar.gz"), ContainerKind::TarGzip);
/// assert_eq!(classify("report.csv.gz"), ContainerKind::Gzip);
/// assert_eq!(classify("notes.txt"), ContainerKind::None);
/// ```
pub fn classify(file_name: impl AsRef<Path>) -> ContainerKind {
    let path = file_name.as_ref();
    if is_tar_gz(path) {
        return ContainerKind::TarGzip;
    }
    ContainerKind::from_extension(&file_extension(path))
}

/// Returns `true` when the whole name ends with `.tar.gz`, ignoring case.
pub fn is_tar_gz(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .to_string_lossy()
        .to_lowercase()
        .ends_with(TAR_GZ_SUFFIX)
}

/// Lowercase trailing extension including the leading dot, or an empty string.
///
/// Names made of a single dotted token such as `.gz` have no extension.
pub fn file_extension(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Coarse check used to decide whether a download is worth extracting.
///
/// One leading dot is optional. The lookup is case-sensitive.
///
/// ```
/// use fetch_extract::is_compressed;
///
/// assert!(is_compressed(".zip"));
/// assert!(is_compressed("tgz"));
/// assert!(!is_compressed(".rar"));
/// ```
pub fn is_compressed(extension: &str) -> bool {
    let ext = extension.strip_prefix('.').unwrap_or(extension);
    COMPRESSED_EXTENSIONS.contains(&ext)
}
