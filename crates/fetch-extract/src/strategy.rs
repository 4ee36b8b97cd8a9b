//! Format-specific extraction procedures.
//!
//! Each strategy is blocking; the dispatcher moves it onto tokio's blocking
//! pool and awaits completion.

use crate::classify::ContainerKind;
use crate::error::ExtractError;
use crate::safety::sanitize_entry_path;
use flate2::bufread::{GzDecoder, MultiGzDecoder};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// First two bytes of every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// A procedure that materializes one container kind under a directory.
///
/// `source` exists and `destination` is a directory by the time `extract`
/// is called.
pub trait ExtractionStrategy: Send + Sync {
    /// Container kind this strategy handles.
    fn kind(&self) -> ContainerKind;

    /// Extract `source` into `destination`, returning once every byte is written.
    fn extract(&self, source: &Path, destination: &Path) -> Result<(), ExtractError>;
}

/// Unpacks every ZIP entry, preserving the internal directory layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipStrategy;

impl ExtractionStrategy for ZipStrategy {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Zip
    }

    fn extract(&self, source: &Path, destination: &Path) -> Result<(), ExtractError> {
        unpack_zip(source, destination).map_err(|e| ExtractError::extraction(self.kind(), e))
    }
}

/// Unpacks a plain tar stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarStrategy;

impl ExtractionStrategy for TarStrategy {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Tar
    }

    fn extract(&self, source: &Path, destination: &Path) -> Result<(), ExtractError> {
        unpack_tar(source, destination).map_err(|e| ExtractError::extraction(self.kind(), e))
    }
}

/// Unpacks a gzip-wrapped tar stream.
///
/// Shares [`TarStrategy`]'s procedure; the gzip layer is detected from the
/// stream itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct TarGzStrategy;

impl ExtractionStrategy for TarGzStrategy {
    fn kind(&self) -> ContainerKind {
        ContainerKind::TarGzip
    }

    fn extract(&self, source: &Path, destination: &Path) -> Result<(), ExtractError> {
        unpack_tar(source, destination).map_err(|e| ExtractError::extraction(self.kind(), e))
    }
}

/// Inflates a single gzip file into `destination/<name without .gz>`.
///
/// The whole file is held in memory; single-file gzip payloads are expected
/// to be small.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipStrategy;

impl ExtractionStrategy for GzipStrategy {
    fn kind(&self) -> ContainerKind {
        ContainerKind::Gzip
    }

    fn extract(&self, source: &Path, destination: &Path) -> Result<(), ExtractError> {
        gunzip_file(source, destination).map_err(|e| ExtractError::extraction(self.kind(), e))
    }
}

fn unpack_zip(source: &Path, destination: &Path) -> io::Result<()> {
    let file = File::open(source)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(zip_to_io)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_to_io)?;

        let relative = match sanitize_entry_path(Path::new(entry.name())) {
            Ok(p) => p,
            Err(e) => {
                warn!(entry = entry.name(), error = %e, "Skipping unsafe ZIP entry");
                continue;
            }
        };
        let output_path = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&output_path)?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        remove_stale_file(&output_path)?;
        let mut output = File::create(&output_path)?;
        io::copy(&mut entry, &mut output)?;

        apply_mode(&output_path, entry.unix_mode())?;

        debug!(entry = %relative.display(), bytes = entry.size(), "Extracted ZIP entry");
    }

    Ok(())
}

/// Drop a file left by an earlier run; its stored mode may be read-only.
fn remove_stale_file(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(path),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    match mode {
        Some(mode) => fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777)),
        None => Ok(()),
    }
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> io::Result<()> {
    Ok(())
}

/// Tar procedure shared by plain and gzip-wrapped archives.
fn unpack_tar(source: &Path, destination: &Path) -> io::Result<()> {
    let mut reader = BufReader::new(File::open(source)?);
    let gzipped = reader.fill_buf()?.starts_with(&GZIP_MAGIC);

    let reader: Box<dyn Read> = if gzipped {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    };

    debug!(gzipped, source = %source.display(), "Unpacking tar stream");
    tar::Archive::new(reader).unpack(destination)
}

fn gunzip_file(source: &Path, destination: &Path) -> io::Result<()> {
    let compressed = fs::read(source)?;

    let mut decompressed = Vec::new();
    MultiGzDecoder::new(compressed.as_slice()).read_to_end(&mut decompressed)?;

    let target = destination.join(gunzipped_name(source));
    fs::write(&target, &decompressed)?;

    debug!(target = %target.display(), bytes = decompressed.len(), "Inflated gzip file");
    Ok(())
}

/// Basename of `source` with one trailing `.gz` removed, ignoring case.
#[cfg(unix)]
fn gunzipped_name(source: &Path) -> OsString {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let Some(name) = source.file_name() else {
        return OsString::new();
    };
    let bytes = name.as_bytes();
    match bytes.len().checked_sub(3) {
        Some(cut) if cut > 0 && bytes[cut..].eq_ignore_ascii_case(b".gz") => {
            OsStr::from_bytes(&bytes[..cut]).to_os_string()
        }
        _ => name.to_os_string(),
    }
}

#[cfg(not(unix))]
fn gunzipped_name(source: &Path) -> OsString {
    let Some(name) = source.file_name() else {
        return OsString::new();
    };
    let text = name.to_string_lossy();
    let cut = text.len().saturating_sub(3);
    if text.len() > 3 && text.is_char_boundary(cut) && text[cut..].eq_ignore_ascii_case(".gz") {
        OsString::from(&text[..cut])
    } else {
        name.to_os_string()
    }
}

fn zip_to_io(err: zip::result::ZipError) -> io::Error {
    match err {
        zip::result::ZipError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}
