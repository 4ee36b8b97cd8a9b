//! HTTP download collaborator.

use crate::classify::{is_tar_gz, TAR_GZ_SUFFIX};
use crate::error::FetchError;
use crate::types::{FetchOptions, FetchResult};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Proxy, Url};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Something that can fetch a URL into a local staging file.
#[async_trait]
pub trait Download: Send + Sync {
    /// Fetch `url`, resolving only once the staging file is fully written.
    async fn download(&self, url: &str) -> Result<FetchResult, FetchError>;
}

/// Streams response bodies into `<staging_dir>/<millis><suffix>`.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    staging_dir: PathBuf,
}

impl HttpDownloader {
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        let mut builder = Client::builder().user_agent(options.user_agent.as_str());
        if !options.system_proxy {
            builder = builder.no_proxy();
        }

        for proxy in &options.proxies {
            let proxy_url = parse_url(proxy)?;
            builder = if proxy_url.scheme() == "https" {
                builder.proxy(Proxy::https(proxy_url)?)
            } else {
                builder.proxy(Proxy::http(proxy_url)?)
            };
        }

        Ok(Self {
            client: builder.build()?,
            staging_dir: options.staging_dir.clone(),
        })
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }
}

#[async_trait]
impl Download for HttpDownloader {
    async fn download(&self, url: &str) -> Result<FetchResult, FetchError> {
        let parsed = parse_url(url)?;
        let file_name = url_file_name(&parsed).to_string();
        let extension = url_extension(&file_name);

        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let (path, mut file) = create_staging_file(&self.staging_dir, &staging_suffix(&file_name)).await?;
        debug!(url, path = %path.display(), "Streaming response to staging file");

        let mut written = 0u64;
        let mut body = response.bytes_stream();
        let copied: Result<(), FetchError> = async {
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = copied {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        info!(url, path = %path.display(), bytes = written, "Download complete");
        Ok(FetchResult {
            url: url.to_string(),
            extension,
            downloaded_file_path: path,
        })
    }
}

fn parse_url(url: &str) -> Result<Url, FetchError> {
    Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Last path segment of the URL; query and fragment are not part of it.
fn url_file_name(url: &Url) -> &str {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("")
}

/// Single trailing extension with its dot, case preserved.
fn url_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default()
}

/// Suffix for the staging file; keeps `.tar.gz` whole so the dispatcher
/// still sees the compound suffix.
fn staging_suffix(file_name: &str) -> String {
    if is_tar_gz(file_name) {
        TAR_GZ_SUFFIX.to_string()
    } else {
        url_extension(file_name)
    }
}

/// Create `<millis><suffix>`, falling back to `<millis>-<n><suffix>` when
/// another download grabbed the same millisecond.
async fn create_staging_file(dir: &Path, suffix: &str) -> Result<(PathBuf, File), FetchError> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();

    for attempt in 0..1000u32 {
        let name = if attempt == 0 {
            format!("{}{}", millis, suffix)
        } else {
            format!("{}-{}{}", millis, attempt, suffix)
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(FetchError::Io(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        "Could not find unique staging file name",
    )))
}
