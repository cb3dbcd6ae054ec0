//! RAR archive codec.
//!
//! Backed by the `unrar` crate, which wraps the reference RAR library.
//! Archives created with encrypted headers fail to list without a password;
//! otherwise encryption is flagged per entry.

use std::fs::create_dir_all;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use unrar::Archive;
use unrar::error::Code;
use unrar::error::UnrarError;

use crate::Credential;
use crate::ExtractError;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::types::ProtectionStatus;

use super::ArchiveKind;
use super::common;
use super::traits::ArchiveCodec;

/// RAR codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct RarCodec;

impl RarCodec {
    /// Creates the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn archive<'a>(source: &'a Path, credential: Option<&'a Credential>) -> Archive<'a> {
        match credential {
            Some(credential) => Archive::with_password(source, credential.as_bytes()),
            None => Archive::new(source),
        }
    }
}

impl ArchiveCodec for RarCodec {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::Rar
    }

    fn probe(&self, source: &Path) -> Result<ProtectionStatus> {
        let listing = match Self::archive(source, None).open_for_listing() {
            Ok(listing) => listing,
            Err(e) if matches!(e.code, Code::MissingPassword) => {
                debug!("rar headers are encrypted");
                return Ok(ProtectionStatus::Protected);
            }
            Err(e) => return Err(classify(e, None, false)),
        };

        for header in listing {
            match header {
                Ok(header) if header.is_encrypted() => {
                    debug!(entry = %header.filename.display(), "rar entry is encrypted");
                    return Ok(ProtectionStatus::Protected);
                }
                Ok(_) => {}
                Err(e) if matches!(e.code, Code::MissingPassword) => {
                    return Ok(ProtectionStatus::Protected);
                }
                Err(e) => return Err(classify(e, None, false)),
            }
        }

        Ok(ProtectionStatus::Unprotected)
    }

    fn entries(
        &self,
        source: &Path,
        credential: Option<&Credential>,
    ) -> Result<Option<Vec<PathBuf>>> {
        let listing = Self::archive(source, credential)
            .open_for_listing()
            .map_err(|e| classify(e, credential, false))?;

        let mut files = Vec::new();
        for header in listing {
            let header = header.map_err(|e| classify(e, credential, false))?;
            if header.is_file() {
                files.push(common::entry_path(&header.filename.to_string_lossy())?);
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
        let mut report = ExtractionReport::new(ArchiveKind::Rar);
        let mut archive = Self::archive(source, credential)
            .open_for_processing()
            .map_err(|e| classify(e, credential, false))?;
        let mut current = 0usize;

        while let Some(header) = archive
            .read_header()
            .map_err(|e| classify(e, credential, false))?
        {
            current += 1;
            let entry = header.entry();
            let encrypted = entry.is_encrypted();
            let relative = common::entry_path(&entry.filename.to_string_lossy())?;
            progress.on_entry_start(&relative, 0, current);

            archive = if entry.is_directory() {
                common::create_directory(dest, &relative, &mut report)?;
                header.skip().map_err(|e| classify(e, credential, encrypted))?
            } else if entry.is_file() {
                let target = dest.join(&relative);
                if let Some(parent) = target.parent() {
                    create_dir_all(parent)?;
                }
                if target.exists() {
                    return Err(ExtractError::corrupt(format!(
                        "duplicate entry: {}",
                        relative.display()
                    )));
                }

                let next = header
                    .extract_to(&target)
                    .map_err(|e| classify(e, credential, encrypted))?;
                let written = std::fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
                report.files_extracted += 1;
                report.bytes_written = report.bytes_written.saturating_add(written);
                progress.on_bytes_written(written);
                next
            } else {
                header.skip().map_err(|e| classify(e, credential, encrypted))?
            };

            progress.on_entry_complete(&relative);
        }

        Ok(report)
    }
}

/// Maps `unrar` errors onto the extraction taxonomy.
///
/// RAR4 has no password check value, so a wrong password on an encrypted
/// entry surfaces as a data checksum failure.
fn classify(err: UnrarError, credential: Option<&Credential>, encrypted: bool) -> ExtractError {
    match err.code {
        Code::MissingPassword => ExtractError::credential_required(),
        Code::BadPassword => {
            if credential.is_some() {
                ExtractError::wrong_credential(err)
            } else {
                ExtractError::credential_required()
            }
        }
        Code::BadData if encrypted && credential.is_some() => ExtractError::wrong_credential(err),
        Code::BadData | Code::BadArchive | Code::UnknownFormat => {
            ExtractError::corrupt_with("invalid rar archive", err)
        }
        _ => ExtractError::unknown_with("rar error", err),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::NoopProgress;
    use tempfile::TempDir;

    #[test]
    fn test_garbage_is_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.rar");
        std::fs::write(&path, b"this is plain text, not an archive").unwrap();

        let err = RarCodec.probe(&path).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Corrupt | ErrorKind::Unknown));
        assert!(!err.is_credential_error());
    }

    #[test]
    fn test_extract_garbage_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.rar");
        std::fs::write(&path, b"not a rar archive").unwrap();
        let out = temp.path().join("out");
        std::fs::create_dir(&out).unwrap();

        assert!(
            RarCodec
                .extract_all(&path, &out, None, &mut NoopProgress)
                .is_err()
        );
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
    }
}
