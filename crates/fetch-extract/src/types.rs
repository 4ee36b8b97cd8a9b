//! Type definitions shared by the dispatcher, the downloader and the facade.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result envelope of a single extraction.
///
/// Either `success` is `true` and `error` is `None`, or `success` is `false`
/// and `error` holds the cause. Build it with [`ExtractionOutcome::succeeded`]
/// or [`ExtractionOutcome::failed`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionOutcome {
    /// Whether every entry was written
    pub success: bool,

    /// Human-readable summary
    pub message: String,

    /// Archive that was extracted
    pub source_path: PathBuf,

    /// Directory the archive was extracted into
    pub destination_directory: PathBuf,

    /// Cause of the failure; its message is already in `message`
    #[serde(skip)]
    pub error: Option<ExtractError>,
}

impl ExtractionOutcome {
    pub fn succeeded(source: &Path, destination: &Path) -> Self {
        Self {
            success: true,
            message: format!(
                "Successfully extracted {} to {}",
                source.display(),
                destination.display()
            ),
            source_path: source.to_path_buf(),
            destination_directory: destination.to_path_buf(),
            error: None,
        }
    }

    pub fn failed(source: &Path, destination: &Path, error: ExtractError) -> Self {
        Self {
            success: false,
            message: error.to_string(),
            source_path: source.to_path_buf(),
            destination_directory: destination.to_path_buf(),
            error: Some(error),
        }
    }

    /// Converts the envelope back into a `Result`, for callers that prefer `?`.
    pub fn into_result(self) -> Result<PathBuf, ExtractError> {
        match self.error {
            None => Ok(self.destination_directory),
            Some(e) => Err(e),
        }
    }
}

/// What the download collaborator hands to the facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchResult {
    /// URL that was downloaded
    pub url: String,

    /// Single trailing extension of the URL file name, with its dot (may be empty)
    pub extension: String,

    /// Staging file holding the response body
    pub downloaded_file_path: PathBuf,
}

/// Output of [`Fetcher::fetch_and_extract`](crate::Fetcher::fetch_and_extract).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub url: String,

    /// Set only when extraction ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_path: Option<PathBuf>,

    /// Full extraction envelope when extraction ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionOutcome>,
}

impl FinalResult {
    /// `true` when extraction ran and did not fail.
    pub fn extracted(&self) -> bool {
        self.extraction.as_ref().is_some_and(|o| o.success)
    }
}

/// What happens to the staging file once the facade is done with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempFilePolicy {
    /// Leave the downloaded file in the staging directory
    #[default]
    Keep,

    /// Remove the downloaded file after the facade returns its result
    Delete,
}

/// Options for [`Fetcher`](crate::Fetcher) and
/// [`HttpDownloader`](crate::HttpDownloader).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchOptions {
    /// Directory receiving downloaded files (default: the platform temp dir)
    pub staging_dir: PathBuf,

    /// `User-Agent` header sent with every request
    pub user_agent: String,

    /// Proxy URLs; `https` ones proxy HTTPS traffic, the rest proxy HTTP
    pub proxies: Vec<String>,

    /// Honor `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY` from the environment
    pub system_proxy: bool,

    /// Retention of the staging file
    pub temp_file_policy: TempFilePolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            staging_dir: std::env::temp_dir(),
            user_agent: concat!("fetch-extract/", env!("CARGO_PKG_VERSION")).to_string(),
            proxies: Vec::new(),
            system_proxy: true,
            temp_file_policy: TempFilePolicy::Keep,
        }
    }
}

impl FetchOptions {
    /// Load options from a JSON file; missing keys fall back to the defaults.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
