//! Extraction dispatcher.
//!
//! Validates paths, picks a strategy from the file name and folds every
//! result into an [`ExtractionOutcome`].

use crate::classify::{file_extension, is_tar_gz, ContainerKind};
use crate::error::ExtractError;
use crate::strategy::{ExtractionStrategy, GzipStrategy, TarGzStrategy, TarStrategy, ZipStrategy};
use crate::types::ExtractionOutcome;
use crate::validate::validate_paths;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maps each [`ContainerKind`] to the strategy that extracts it.
///
/// The dispatcher is stateless between calls; the strategy table is built
/// once and only read afterwards.
#[derive(Clone)]
pub struct Extractor {
    strategies: HashMap<ContainerKind, Arc<dyn ExtractionStrategy>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            strategies: HashMap::new(),
        }
        .with_strategy(ZipStrategy)
        .with_strategy(GzipStrategy)
        .with_strategy(TarStrategy)
        .with_strategy(TarGzStrategy)
    }
}

impl Extractor {
    /// Dispatcher with the ZIP, GZIP, TAR and TAR+GZIP strategies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `strategy` for its kind, replacing any previous one.
    pub fn with_strategy(mut self, strategy: impl ExtractionStrategy + 'static) -> Self {
        self.strategies.insert(strategy.kind(), Arc::new(strategy));
        self
    }

    /// Extract `source` into `destination`.
    ///
    /// Never fails: every error, including a panicking strategy, ends up in
    /// a failed outcome. A failure in the middle of an archive leaves the
    /// entries written so far in place.
    pub async fn extract(
        &self,
        source: impl AsRef<Path>,
        destination: impl AsRef<Path>,
    ) -> ExtractionOutcome {
        let source = source.as_ref();
        let destination = destination.as_ref();

        match self.try_extract(source, destination).await {
            Ok(kind) => {
                info!(
                    %kind,
                    source = %source.display(),
                    destination = %destination.display(),
                    "Extraction complete"
                );
                ExtractionOutcome::succeeded(source, destination)
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "Extraction failed");
                ExtractionOutcome::failed(source, destination, e)
            }
        }
    }

    async fn try_extract(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<ContainerKind, ExtractError> {
        validate_paths(source, destination).await?;

        let kind = select_kind(source)?;
        let strategy = self
            .strategies
            .get(&kind)
            .cloned()
            .ok_or_else(|| ExtractError::UnsupportedFormat(kind.to_string()))?;
        debug!(%kind, source = %source.display(), "Dispatching extraction");

        let source_owned = source.to_path_buf();
        let destination_owned = destination.to_path_buf();
        tokio::task::spawn_blocking(move || strategy.extract(&source_owned, &destination_owned))
            .await
            .map_err(|e| {
                ExtractError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("Task join error: {}", e),
                ))
            })??;

        Ok(kind)
    }
}

/// Pick the container kind the dispatcher will use for `source`.
///
/// `.zip` wins first, then the compound `.tar.gz` suffix or `.tgz`, then
/// `.tar`, then `.gz`. The compound check has to come before `.gz` because
/// the trailing extension of `x.tar.gz` is `.gz`.
pub fn select_kind(source: &Path) -> Result<ContainerKind, ExtractError> {
    let file_ext = file_extension(source);
    let tar_gz = is_tar_gz(source);
    let single = ContainerKind::from_extension(&file_ext);

    if single == ContainerKind::None && !tar_gz {
        return Err(ExtractError::UnsupportedFormat(file_ext));
    }

    let kind = match single {
        ContainerKind::Zip => ContainerKind::Zip,
        _ if tar_gz => ContainerKind::TarGzip,
        other => other,
    };
    Ok(kind)
}

/// Extract with a default [`Extractor`].
pub async fn extract_file(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
) -> ExtractionOutcome {
    Extractor::new().extract(source, destination).await
}
