//! ZIP archive codec.
//!
//! Backed by the `zip` crate. Both AES and legacy ZipCrypto entries are
//! decrypted when a credential is given.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use zip::ZipArchive;
use zip::read::ZipFile;
use zip::result::ZipError;

use crate::Credential;
use crate::ExtractError;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::types::ProtectionStatus;

use super::ArchiveKind;
use super::common;
use super::traits::ArchiveCodec;

/// ZIP codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipCodec;

impl ZipCodec {
    /// Creates the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn open(source: &Path) -> Result<ZipArchive<BufReader<File>>> {
        let file = File::open(source)?;
        ZipArchive::new(BufReader::new(file)).map_err(|e| classify(e, None))
    }

    fn entry_path(file: &ZipFile<'_, BufReader<File>>) -> Result<PathBuf> {
        file.enclosed_name().ok_or_else(|| {
            ExtractError::corrupt(format!(
                "entry name escapes the destination: {}",
                file.name()
            ))
        })
    }
}

impl ArchiveCodec for ZipCodec {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Zip
    }

    fn probe(&self, source: &Path) -> Result<ProtectionStatus> {
        let mut archive = Self::open(source)?;

        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index).map_err(|e| classify(e, None))?;
            if entry.encrypted() {
                debug!(entry = entry.name(), "zip entry carries the encryption flag");
                return Ok(ProtectionStatus::Protected);
            }
        }

        Ok(ProtectionStatus::Unprotected)
    }

    fn entries(
        &self,
        source: &Path,
        _credential: Option<&Credential>,
    ) -> Result<Option<Vec<PathBuf>>> {
        let mut archive = Self::open(source)?;
        let mut files = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index).map_err(|e| classify(e, None))?;
            if !entry.is_dir() {
                files.push(Self::entry_path(&entry)?);
            }
        }

        Ok(Some(files))
    }

    fn extract_all(
        &self,
        source: &Path,
        dest: &Path,
        credential: Option<&Credential>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let mut archive = Self::open(source)?;
        let mut report = ExtractionReport::new(ArchiveKind::Zip);
        let total = archive.len();

        for index in 0..total {
            let mut entry = match credential {
                Some(credential) => archive.by_index_decrypt(index, credential.as_bytes()),
                None => archive.by_index(index),
            }
            .map_err(|e| classify(e, credential))?;

            let relative = Self::entry_path(&entry)?;
            progress.on_entry_start(&relative, total, index + 1);

            if entry.is_dir() {
                common::create_directory(dest, &relative, &mut report)?;
            } else {
                let encrypted = entry.encrypted();
                let mut reader = common::TrackingReader::new(&mut entry);
                let written = common::extract_file(&mut reader, dest, &relative, &mut report)
                    .map_err(|e| {
                        classify_read_failure(e, reader.take_error(), encrypted, credential)
                    })?;
                progress.on_bytes_written(written);
            }

            progress.on_entry_complete(&relative);
        }

        Ok(report)
    }
}

/// Maps `zip` crate errors onto the extraction taxonomy.
fn classify(err: ZipError, credential: Option<&Credential>) -> ExtractError {
    match err {
        ZipError::UnsupportedArchive(msg) if msg == ZipError::PASSWORD_REQUIRED => {
            if credential.is_some() {
                ExtractError::wrong_credential(ZipError::UnsupportedArchive(msg))
            } else {
                ExtractError::credential_required()
            }
        }
        ZipError::InvalidPassword => {
            if credential.is_some() {
                ExtractError::wrong_credential(err)
            } else {
                ExtractError::credential_required()
            }
        }
        ZipError::InvalidArchive(_) => ExtractError::corrupt_with("invalid zip archive", err),
        ZipError::UnsupportedArchive(msg) => {
            ExtractError::unsupported(format!("zip feature not supported: {msg}"))
        }
        ZipError::Io(io) => ExtractError::from(io),
        other => ExtractError::unknown_with("zip error", other),
    }
}

/// Classifies a failed entry write by what went wrong while reading it.
///
/// ZipCrypto checks a single byte of the password up front and AES verifies
/// its authentication code only at the end of the stream, so a wrong password
/// can surface as any decode failure of an encrypted entry. Invalid data in a
/// plain entry is corruption. Failures on the write side pass through.
fn classify_read_failure(
    err: ExtractError,
    read_error: Option<std::io::Error>,
    encrypted: bool,
    credential: Option<&Credential>,
) -> ExtractError {
    let Some(read_error) = read_error else {
        return err;
    };

    if encrypted && credential.is_some() {
        ExtractError::wrong_credential(read_error)
    } else if read_error.kind() == std::io::ErrorKind::InvalidData {
        ExtractError::corrupt_with("zip entry failed to decode", read_error)
    } else {
        err
    }
}
