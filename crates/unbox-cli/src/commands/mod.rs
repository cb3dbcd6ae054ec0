//! Subcommand implementations.

pub mod completion;
pub mod extract;
pub mod probe;

use anyhow::Result;
use std::path::Path;
use unbox_core::ArchiveKind;
use unbox_core::ExtractConfig;
use unbox_core::Extractor;
use unbox_core::SevenZipBackend;

use crate::cli::BackendArgs;
use crate::error::add_source_context;

/// Uses the kind given on the command line, or detects it from the file.
pub fn resolve_kind(backend: &BackendArgs, source: &Path) -> Result<ArchiveKind> {
    match backend.kind {
        Some(kind) => Ok(kind),
        None => add_source_context(ArchiveKind::detect(source), source),
    }
}

/// Applies the backend options to `config` and builds the extractor.
pub fn build_extractor(backend: &BackendArgs, config: ExtractConfig) -> Result<Extractor> {
    let mut config = config;
    if let Some(binary) = &backend.seven_zip_binary {
        config = config.with_seven_zip_backend(SevenZipBackend::Command {
            binary: binary.clone(),
        });
    }
    if let Some(library) = &backend.pdfium_library {
        config = config.with_pdfium_library(library.clone());
    }
    Ok(Extractor::with_config(config)?)
}
