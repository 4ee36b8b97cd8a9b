//! Fetch-and-extract facade.

use crate::classify::is_compressed;
use crate::download::{Download, HttpDownloader};
use crate::error::FetchError;
use crate::extract::Extractor;
use crate::types::{FetchOptions, FinalResult, TempFilePolicy};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-directory async locks so two extractions through the same
/// [`Fetcher`] never write into one directory at the same time.
#[derive(Default)]
struct DirectoryLocks {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl DirectoryLocks {
    fn lock_for(&self, dir: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        // Nobody else holds these, drop them before the map grows
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(dir.to_path_buf()).or_default().clone()
    }
}

/// Downloads a URL and, when the extension says it is an archive, extracts
/// it into a destination directory.
///
/// Download failures are returned as `Err`; extraction failures are values
/// inside [`FinalResult::extraction`].
pub struct Fetcher<D = HttpDownloader> {
    downloader: D,
    extractor: Extractor,
    temp_file_policy: TempFilePolicy,
    locks: DirectoryLocks,
}

impl Fetcher<HttpDownloader> {
    /// Facade over an [`HttpDownloader`] built from `options`.
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        Ok(Self::with_downloader(HttpDownloader::new(options)?)
            .with_temp_file_policy(options.temp_file_policy))
    }
}

impl<D: Download> Fetcher<D> {
    pub fn with_downloader(downloader: D) -> Self {
        Self {
            downloader,
            extractor: Extractor::default(),
            temp_file_policy: TempFilePolicy::default(),
            locks: DirectoryLocks::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// What to do with the staging file once extraction ran.
    ///
    /// Downloads that are not extracted are always kept, since the staging
    /// file is then the only copy of the payload.
    pub fn with_temp_file_policy(mut self, policy: TempFilePolicy) -> Self {
        self.temp_file_policy = policy;
        self
    }

    /// Download `url` and extract it into `destination` when its extension
    /// is one of `zip`, `tgz`, `gz` or `tar`.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be created or the
    /// download fails. A failed extraction is reported through
    /// [`FinalResult::extraction`] instead.
    pub async fn fetch_and_extract(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
    ) -> Result<FinalResult, FetchError> {
        let destination = destination.as_ref();
        tokio::fs::create_dir_all(destination).await?;

        let fetched = self.downloader.download(url).await?;

        if !is_compressed(&fetched.extension) {
            debug!(url, extension = %fetched.extension, "Not an archive, skipping extraction");
            return Ok(FinalResult {
                url: url.to_string(),
                destination_path: None,
                extraction: None,
            });
        }

        let key = tokio::fs::canonicalize(destination)
            .await
            .unwrap_or_else(|_| destination.to_path_buf());
        let lock = self.locks.lock_for(&key);
        let outcome = {
            let _guard = lock.lock().await;
            self.extractor
                .extract(&fetched.downloaded_file_path, destination)
                .await
        };

        if self.temp_file_policy == TempFilePolicy::Delete {
            if let Err(e) = tokio::fs::remove_file(&fetched.downloaded_file_path).await {
                warn!(
                    path = %fetched.downloaded_file_path.display(),
                    error = %e,
                    "Failed to remove staging file"
                );
            }
        }

        info!(url, success = outcome.success, "Fetch and extract finished");
        Ok(FinalResult {
            url: url.to_string(),
            destination_path: Some(outcome.destination_directory.clone()),
            extraction: Some(outcome),
        })
    }
}

/// Fetch and extract with default [`FetchOptions`].
pub async fn fetch_and_extract(
    url: &str,
    destination: impl AsRef<Path>,
) -> Result<FinalResult, FetchError> {
    Fetcher::new(&FetchOptions::default())?
        .fetch_and_extract(url, destination)
        .await
}
