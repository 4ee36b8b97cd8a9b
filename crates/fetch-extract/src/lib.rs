//! # fetch-extract
//!
//! Download a resource over HTTP(S) and, when it is an archive, extract it
//! into a directory in one step.
//!
//! ## Supported Formats
//!
//! - ZIP
//! - GZIP (single file)
//! - TAR
//! - TAR + GZIP (`.tar.gz`, `.tgz`)
//!
//! The format is chosen from the file name. A `.tar.gz` suffix is checked as
//! a whole before the plain `.gz` extension.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fetch_extract::{extract_file, FetchOptions, Fetcher, TempFilePolicy};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! // Extract a local archive; failures come back as a value
//! let outcome = extract_file("release.tar.gz", "out").await;
//! if !outcome.success {
//!     eprintln!("{}", outcome.message);
//! }
//!
//! // Download and extract
//! let options = FetchOptions {
//!     temp_file_policy: TempFilePolicy::Delete,
//!     ..FetchOptions::default()
//! };
//! let fetcher = Fetcher::new(&options)?;
//! let result = fetcher
//!     .fetch_and_extract("https://example.com/data.zip", "data")
//!     .await?;
//! println!("extracted: {}", result.extracted());
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod download;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod safety;
pub mod strategy;
pub mod types;
pub mod validate;

// Re-export main types
pub use classify::{classify, is_compressed, ContainerKind};
pub use download::{Download, HttpDownloader};
pub use error::{ExtractError, FetchError, SecurityError};
pub use extract::{extract_file, Extractor};
pub use fetch::{fetch_and_extract, Fetcher};
pub use strategy::ExtractionStrategy;
pub use types::{ExtractionOutcome, FetchOptions, FetchResult, FinalResult, TempFilePolicy};
