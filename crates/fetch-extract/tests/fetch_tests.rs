//! Integration tests for the download collaborator and the facade.

use async_trait::async_trait;
use fetch_extract::{
    Download, FetchError, FetchOptions, FetchResult, Fetcher, HttpDownloader, TempFilePolicy,
};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, content) in files {
        zip.start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Serves canned payloads from a staging directory instead of the network.
struct FakeDownloader {
    staging: PathBuf,
    payload: Vec<u8>,
    calls: AtomicUsize,
}

impl FakeDownloader {
    fn new(staging: &Path, payload: Vec<u8>) -> Self {
        Self {
            staging: staging.to_path_buf(),
            payload,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Download for FakeDownloader {
    async fn download(&self, url: &str) -> Result<FetchResult, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let name = url.rsplit('/').next().unwrap_or_default();
        let extension = Path::new(name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let path = self.staging.join(format!("{n}{extension}"));
        tokio::fs::write(&path, &self.payload).await?;

        Ok(FetchResult {
            url: url.to_string(),
            extension,
            downloaded_file_path: path,
        })
    }
}

/// Downloader that always fails the way a dropped connection would.
struct FailingDownloader;

#[async_trait]
impl Download for FailingDownloader {
    async fn download(&self, _url: &str) -> Result<FetchResult, FetchError> {
        Err(FetchError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )))
    }
}

/// One-shot HTTP/1.1 server answering every request with `status` and `body`.
async fn serve(status: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = format!(
                    "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{addr}")
}

fn options_for(staging: &Path) -> FetchOptions {
    FetchOptions {
        staging_dir: staging.to_path_buf(),
        system_proxy: false,
        ..FetchOptions::default()
    }
}

#[tokio::test]
async fn test_fetch_extracts_compressed_download() {
    let temp_dir = TempDir::new().unwrap();
    let payload = zip_bytes(&[("docs/guide.txt", b"read me"), ("top.txt", b"top")]);
    let fetcher = Fetcher::with_downloader(FakeDownloader::new(temp_dir.path(), payload));
    let dest = temp_dir.path().join("nested/dest");

    let result = fetcher
        .fetch_and_extract("https://example.com/bundle.zip", &dest)
        .await
        .unwrap();

    assert_eq!(result.url, "https://example.com/bundle.zip");
    assert_eq!(result.destination_path.as_deref(), Some(dest.as_path()));
    assert!(result.extracted());
    assert_eq!(fs::read(dest.join("docs/guide.txt")).unwrap(), b"read me");
    assert_eq!(fs::read(dest.join("top.txt")).unwrap(), b"top");

    // Kept by default
    assert!(temp_dir.path().join("0.zip").exists());
}

#[tokio::test]
async fn test_fetch_skips_extraction_for_plain_files() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Fetcher::with_downloader(FakeDownloader::new(temp_dir.path(), b"hello".to_vec()))
        .with_temp_file_policy(TempFilePolicy::Delete);
    let dest = temp_dir.path().join("dest");

    let result = fetcher
        .fetch_and_extract("https://example.com/notes.txt", &dest)
        .await
        .unwrap();

    assert!(result.destination_path.is_none());
    assert!(result.extraction.is_none());
    assert!(!result.extracted());
    assert!(dest.is_dir());
    assert_eq!(fs::read_dir(&dest).unwrap().count(), 0);
    // Never extracted, so the staging file is the only copy and stays
    assert!(temp_dir.path().join("0.txt").exists());
}

#[tokio::test]
async fn test_fetch_reports_failed_extraction_as_value() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Fetcher::with_downloader(FakeDownloader::new(
        temp_dir.path(),
        b"not a zip at all".to_vec(),
    ));
    let dest = temp_dir.path().join("dest");

    let result = fetcher
        .fetch_and_extract("https://example.com/broken.zip", &dest)
        .await
        .unwrap();

    assert_eq!(result.destination_path.as_deref(), Some(dest.as_path()));
    let outcome = result.extraction.as_ref().unwrap();
    assert!(!outcome.success);
    assert!(outcome.error.is_some());
    assert!(!result.extracted());
}

#[tokio::test]
async fn test_fetch_delete_policy_removes_staging_file() {
    let temp_dir = TempDir::new().unwrap();
    let payload = zip_bytes(&[("a.txt", b"a")]);
    let fetcher = Fetcher::with_downloader(FakeDownloader::new(temp_dir.path(), payload))
        .with_temp_file_policy(TempFilePolicy::Delete);
    let dest = temp_dir.path().join("dest");

    let result = fetcher
        .fetch_and_extract("https://example.com/a.zip", &dest)
        .await
        .unwrap();

    assert!(result.extracted());
    assert!(dest.join("a.txt").exists());
    assert!(!temp_dir.path().join("0.zip").exists());
}

#[tokio::test]
async fn test_fetch_propagates_download_failure() {
    let temp_dir = TempDir::new().unwrap();
    let fetcher = Fetcher::with_downloader(FailingDownloader);

    let result = fetcher
        .fetch_and_extract("https://example.com/a.zip", temp_dir.path().join("dest"))
        .await;

    assert!(matches!(result, Err(FetchError::Io(_))));
}

#[tokio::test]
async fn test_concurrent_fetches_into_same_directory() {
    let temp_dir = TempDir::new().unwrap();
    let payload = zip_bytes(&[("shared/one.txt", b"1"), ("shared/two.txt", b"2")]);
    let fetcher = Fetcher::with_downloader(FakeDownloader::new(temp_dir.path(), payload));
    let dest = temp_dir.path().join("dest");

    let (a, b) = tokio::join!(
        fetcher.fetch_and_extract("https://example.com/x.zip", &dest),
        fetcher.fetch_and_extract("https://example.com/y.zip", &dest),
    );

    assert!(a.unwrap().extracted());
    assert!(b.unwrap().extracted());
    assert_eq!(fs::read(dest.join("shared/two.txt")).unwrap(), b"2");
}

#[tokio::test]
async fn test_http_downloader_streams_body_to_staging_file() {
    let temp_dir = TempDir::new().unwrap();
    let payload = zip_bytes(&[("from/server.txt", b"over the wire")]);
    let base = serve("200 OK", payload.clone()).await;
    let downloader = HttpDownloader::new(&options_for(temp_dir.path())).unwrap();

    let fetched = downloader
        .download(&format!("{base}/files/bundle.zip?sig=abc"))
        .await
        .unwrap();

    assert_eq!(fetched.extension, ".zip");
    assert_eq!(fetched.downloaded_file_path.parent(), Some(temp_dir.path()));
    let name = fetched.downloaded_file_path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.ends_with(".zip"));
    assert!(name.trim_end_matches(".zip").chars().all(|c| c.is_ascii_digit()));
    assert_eq!(fs::read(&fetched.downloaded_file_path).unwrap(), payload);
}

#[tokio::test]
async fn test_http_fetch_and_extract_tar_gz_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let mut tarball = Vec::new();
    {
        let encoder = flate2::write::GzEncoder::new(&mut tarball, flate2::Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, "pkg/VERSION", &b"1.0\n"[..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }
    let base = serve("200 OK", tarball).await;

    let staging = temp_dir.path().join("staging");
    let dest = temp_dir.path().join("dest");
    let fetcher = Fetcher::new(&options_for(&staging)).unwrap();

    let result = fetcher
        .fetch_and_extract(&format!("{base}/release.tar.gz"), &dest)
        .await
        .unwrap();

    assert!(result.extracted(), "{:?}", result.extraction);
    assert_eq!(fs::read(dest.join("pkg/VERSION")).unwrap(), b"1.0\n");
    // Staging name keeps the compound suffix so the tarball is not gunzipped as a single file
    let staged: Vec<_> = fs::read_dir(&staging).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(staged.len(), 1);
    assert!(staged[0].to_string_lossy().ends_with(".tar.gz"));
}

#[tokio::test]
async fn test_http_error_status_is_a_fetch_error() {
    let temp_dir = TempDir::new().unwrap();
    let base = serve("404 Not Found", b"missing".to_vec()).await;
    let downloader = HttpDownloader::new(&options_for(temp_dir.path())).unwrap();

    let err = downloader
        .download(&format!("{base}/gone.zip"))
        .await
        .unwrap_err();

    match err {
        FetchError::Status { status, .. } => assert_eq!(status.as_u16(), 404),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unreachable_host_is_a_transport_error() {
    let temp_dir = TempDir::new().unwrap();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let fetcher = Fetcher::new(&options_for(temp_dir.path())).unwrap();
    let result = fetcher
        .fetch_and_extract(&format!("http://{addr}/a.zip"), temp_dir.path().join("dest"))
        .await;

    assert!(matches!(result, Err(FetchError::Transport(_))));
}

#[tokio::test]
async fn test_invalid_url_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let downloader = HttpDownloader::new(&options_for(temp_dir.path())).unwrap();

    let err = downloader.download("not a url").await.unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl { .. }));
}

#[test]
fn test_fetch_options_load_from_json_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fetch.json");
    let mut file = File::create(&path).unwrap();
    write!(
        file,
        r#"{{ "stagingDir": "{}", "userAgent": "tests/1.0", "tempFilePolicy": "delete" }}"#,
        temp_dir.path().join("staging").display()
    )
    .unwrap();

    let options = FetchOptions::load(&path).unwrap();
    assert_eq!(options.staging_dir, temp_dir.path().join("staging"));
    assert_eq!(options.user_agent, "tests/1.0");
    assert_eq!(options.temp_file_policy, TempFilePolicy::Delete);
    assert!(options.proxies.is_empty());
}
