//! Zip archive extraction.
//!
//! Statements are usually delivered as an AES-encrypted zip holding one PDF.
//! Entries are written below the destination directory only; an entry whose
//! name would escape it fails the whole extraction.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot open archive {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("wrong or missing archive password")]
    InvalidPassword,

    #[error("corrupt archive: {0}")]
    Corrupt(String),

    #[error("unsafe entry path in archive: {0}")]
    UnsafePath(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<ZipError> for ArchiveError {
    fn from(err: ZipError) -> Self {
        match err {
            ZipError::InvalidPassword => ArchiveError::InvalidPassword,
            ZipError::UnsupportedArchive(msg) if msg == ZipError::PASSWORD_REQUIRED => {
                ArchiveError::InvalidPassword
            }
            ZipError::Io(e) => ArchiveError::Io(e),
            other => ArchiveError::Corrupt(other.to_string()),
        }
    }
}

fn open(path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ZipArchive::new(file)?)
}

/// Whether any entry of the archive at `path` is encrypted.
pub fn is_encrypted(path: &Path) -> Result<bool, ArchiveError> {
    let mut archive = open(path)?;
    for i in 0..archive.len() {
        if archive.by_index_raw(i)?.encrypted() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Extract every file entry of the archive at `path` into `dest`.
///
/// Returns the extracted file paths in archive order.
///
/// # Errors
///
/// [`ArchiveError::InvalidPassword`] when an encrypted entry cannot be
/// decrypted with `password` (or no password was given),
/// [`ArchiveError::UnsafePath`] for entries naming absolute or parent paths.
pub fn extract_archive(
    path: &Path,
    dest: &Path,
    password: Option<&str>,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut archive = open(path)?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = match password {
            Some(password) => archive.by_index_decrypt(i, password.as_bytes())?,
            None => archive.by_index(i)?,
        };
        let relative = entry
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafePath(entry.name().to_string()))?;
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out).map_err(|e| match e.kind() {
            // a ZipCrypto key that slipped past the header check fails the CRC
            io::ErrorKind::InvalidData => ArchiveError::InvalidPassword,
            _ => ArchiveError::Io(e),
        })?;
        debug!(entry = %target.display(), "extracted");
        extracted.push(target);
    }

    Ok(extracted)
}

/// Whether `path` has the given extension, ignoring ASCII case.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}
