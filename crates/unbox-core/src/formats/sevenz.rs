//! 7z archive codec.
//!
//! Uses the in-process `sevenz-rust2` decoder. Encrypted archives come in two
//! flavours: with encrypted headers the archive cannot even be listed without
//! the password, otherwise only the content streams are encrypted and the
//! password is needed once the first stream is decoded.
//!
//! # Symlinks
//!
//! `sevenz-rust2` does not expose entry types beyond file and directory, so
//! Unix symlinks are extracted as regular files holding the link target.

use std::cell::RefCell;
use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use sevenz_rust2::Archive;
use sevenz_rust2::Password;
use tracing::debug;

use crate::Credential;
use crate::ExtractError;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::types::ProtectionStatus;

use super::ArchiveKind;
use super::common;
use super::traits::ArchiveCodec;

/// 7z codec backed by `sevenz-rust2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SevenZCodec;

impl SevenZCodec {
    /// Creates the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn password(credential: Option<&Credential>) -> Password {
        credential.map_or_else(Password::empty, |c| Password::from(c.expose()))
    }

    fn read_archive(source: &Path, credential: Option<&Credential>) -> Result<Archive> {
        let mut reader = BufReader::new(File::open(source)?);
        Archive::read(&mut reader, &Self::password(credential))
            .map_err(|e| classify(e, credential))
    }
}

impl ArchiveCodec for SevenZCodec {
    fn kind(&self) -> ArchiveKind {
        ArchiveKind::SevenZip
    }

    fn probe(&self, source: &Path) -> Result<ProtectionStatus> {
        let archive = match Self::read_archive(source, None) {
            Ok(archive) => archive,
            Err(e) if e.is_credential_error() => {
                debug!("7z header is encrypted");
                return Ok(ProtectionStatus::Protected);
            }
            Err(e) => return Err(e),
        };

        if !archive.files.iter().any(|e| !e.is_directory() && e.size > 0) {
            return Ok(ProtectionStatus::Unprotected);
        }
        drop(archive);

        // Content encryption only shows up once a stream is decoded; one buffer
        // of the first non-empty entry is enough.
        let reader = BufReader::new(File::open(source)?);
        let decoded = sevenz_rust2::decompress_with_extract_fn(
            reader,
            std::env::temp_dir(),
            |entry: &sevenz_rust2::ArchiveEntry,
             data: &mut dyn Read,
             _dest: &PathBuf|
             -> std::result::Result<bool, sevenz_rust2::Error> {
                if entry.is_directory() || entry.size == 0 {
                    return Ok(true);
                }
                let mut buf = [0u8; 4096];
                let _ = data.read(&mut buf)?;
                Ok(false)
            },
        );

        match decoded.map_err(|e| classify(e, None)) {
            Ok(()) => Ok(ProtectionStatus::Unprotected),
            Err(e) if e.is_credential_error() => {
                debug!("7z content streams are encrypted");
                Ok(ProtectionStatus::Protected)
            }
            Err(e) => Err(e),
        }
    }

    fn entries(
        &self,
        source: &Path,
        credential: Option<&Credential>,
    ) -> Result<Option<Vec<PathBuf>>> {
        let archive = Self::read_archive(source, credential)?;
        archive
            .files
            .iter()
            .filter(|e| !e.is_directory())
            .map(|e| common::entry_path(&e.name))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn extract_all(
        &self,
        source: &Path,
        dest: &Path,
        credential: Option<&Credential>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let total = Self::read_archive(source, credential)?.files.len();
        let reader = BufReader::new(File::open(source)?);

        let report = RefCell::new(ExtractionReport::new(ArchiveKind::SevenZip));
        let failure: RefCell<Option<ExtractError>> = RefCell::new(None);
        let mut current = 0usize;

        let extract_fn = |entry: &sevenz_rust2::ArchiveEntry,
                          data: &mut dyn Read,
                          _dest: &PathBuf|
         -> std::result::Result<bool, sevenz_rust2::Error> {
            current += 1;
            let mut data = common::TrackingReader::new(data);
            let outcome = (|| -> Result<()> {
                let relative = common::entry_path(&entry.name)?;
                progress.on_entry_start(&relative, total, current);

                let mut report = report.borrow_mut();
                if entry.is_directory() {
                    common::create_directory(dest, &relative, &mut report)?;
                } else {
                    let written = common::extract_file(&mut data, dest, &relative, &mut report)?;
                    progress.on_bytes_written(written);
                }

                progress.on_entry_complete(&relative);
                Ok(())
            })();

            match (outcome, data.take_error()) {
                (Ok(()), _) => Ok(true),
                // Decode failures go back to the library, which knows
                // whether a password was involved.
                (Err(_), Some(read_error)) => Err(read_error.into()),
                (Err(e), None) => {
                    let message = e.to_string();
                    *failure.borrow_mut() = Some(e);
                    Err(sevenz_rust2::Error::Other(message.into()))
                }
            }
        };

        let result = sevenz_rust2::decompress_with_extract_fn_and_password(
            reader,
            dest,
            Self::password(credential),
            extract_fn,
        );

        if let Some(err) = failure.into_inner() {
            return Err(err);
        }
        result.map_err(|e| classify(e, credential))?;

        Ok(report.into_inner())
    }
}

/// Maps `sevenz-rust2` errors onto the extraction taxonomy.
fn classify(err: sevenz_rust2::Error, credential: Option<&Credential>) -> ExtractError {
    let credential_failure = match &err {
        sevenz_rust2::Error::PasswordRequired | sevenz_rust2::Error::MaybeBadPassword(_) => true,
        other => {
            let text = other.to_string().to_lowercase();
            text.contains("password")
                || text.contains("encrypt")
                || (credential.is_some() && text.contains("checksum"))
        }
    };

    if credential_failure {
        return if credential.is_some() {
            ExtractError::wrong_credential(err)
        } else {
            ExtractError::credential_required()
        };
    }

    match err {
        sevenz_rust2::Error::Io(..) => ExtractError::unknown_with("7z I/O error", err),
        other => {
            let text = other.to_string().to_lowercase();
            if text.contains("unsupported") {
                ExtractError::unsupported(format!("7z feature not supported: {other}"))
            } else {
                ExtractError::corrupt_with("invalid 7z archive", other)
            }
        }
    }
}
