//! Error conversion utilities for CLI.
//!
//! Converts unbox-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use std::path::Path;
use unbox_core::ExtractError;

/// Converts `ExtractError` to a user-friendly anyhow error with a hint.
pub fn convert_extract_error(err: ExtractError, source: &Path) -> anyhow::Error {
    match err {
        ExtractError::NotFound { path } => {
            anyhow!(
                "Source not found: {}\n\
                 HINT: Check the path and that the file exists.",
                path.display()
            )
        }
        ExtractError::WrongCredential { message, .. } => {
            anyhow!(
                "Cannot unlock '{}': {}\n\
                 HINT: Pass the password with --password or --password-env.",
                source.display(),
                message
            )
        }
        ExtractError::AlreadyExists { path } => {
            anyhow!(
                "Output already exists: {}\n\
                 HINT: Nothing was written. Choose an empty output directory or remove the existing files.",
                path.display()
            )
        }
        ExtractError::Corrupt { message, .. } => {
            anyhow!(
                "Corrupt container '{}': {}\n\
                 HINT: The file may be truncated or damaged.",
                source.display(),
                message
            )
        }
        ExtractError::Unsupported { message } => {
            anyhow!(
                "Not supported for '{}': {}\n\
                 HINT: Supported kinds: zip, rar, 7z, pdf. Use --kind to override detection, \
                 --seven-zip-binary for a 7z binary or --pdfium-library for pdf rendering.",
                source.display(),
                message
            )
        }
        err @ ExtractError::Unknown { .. } => anyhow::Error::from(err)
            .context(format!("Error processing '{}'", source.display())),
    }
}

/// Adds source context to a core result.
pub fn add_source_context<T>(
    result: Result<T, ExtractError>,
    source: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_extract_error(e, source))
}
