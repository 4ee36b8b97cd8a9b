//! Command-line interface for downloading and extracting archives.
//!
//! `fetch` downloads a URL and extracts it when it is an archive;
//! `extract` runs the extraction dispatcher on a local file.

use clap::{Parser, Subcommand};
use fetch_extract::{extract_file, ExtractionOutcome, FetchOptions, Fetcher, TempFilePolicy};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "fetch-extract")]
#[command(version, about = "Download a URL and extract it if it is an archive", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a URL and extract it into a directory
    Fetch {
        /// URL to download
        url: String,

        /// Destination directory
        #[arg(short, long)]
        out: PathBuf,

        /// JSON file with fetch options
        #[arg(long)]
        config: Option<PathBuf>,

        /// Delete the downloaded file after extraction
        #[arg(long)]
        delete_download: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a local ZIP, GZIP, TAR or TAR.GZ file
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Destination directory
        #[arg(short, long)]
        out: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch {
            url,
            out,
            config,
            delete_download,
            json,
        } => handle_fetch(url, out, config, delete_download, json).await,
        Commands::Extract { archive, out, json } => handle_extract(archive, out, json).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn handle_fetch(
    url: String,
    out: PathBuf,
    config: Option<PathBuf>,
    delete_download: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut options = match config {
        Some(path) => FetchOptions::load(&path)?,
        None => FetchOptions::default(),
    };
    if delete_download {
        options.temp_file_policy = TempFilePolicy::Delete;
    }

    let result = Fetcher::new(&options)?.fetch_and_extract(&url, &out).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        match &result.extraction {
            Some(outcome) => report(outcome, false)?,
            None => println!("Downloaded {} (not an archive, nothing extracted)", result.url),
        }
    }

    match result.extraction {
        Some(outcome) if !outcome.success => Err(outcome.message.into()),
        _ => Ok(()),
    }
}

async fn handle_extract(
    archive: PathBuf,
    out: PathBuf,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = extract_file(&archive, &out).await;
    report(&outcome, json)?;

    if outcome.success {
        Ok(())
    } else {
        Err(outcome.message.into())
    }
}

fn report(outcome: &ExtractionOutcome, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else if outcome.success {
        println!("{}", outcome.message);
    }
    Ok(())
}
