//! PDF page renderer backed by pdfium.
//!
//! pdfium is bound at runtime, from the system library path or from a
//! configured location, the first time a document is opened. A missing
//! library is reported as `Unsupported`.

use std::path::Path;
use std::path::PathBuf;
use std::sync::OnceLock;

use image::RgbaImage;
use pdfium_render::prelude::PdfDocument as PdfiumDocument;
use pdfium_render::prelude::PdfRenderConfig;
use pdfium_render::prelude::PdfSecurityHandlerRevision;
use pdfium_render::prelude::Pdfium;
use pdfium_render::prelude::PdfiumError;
use pdfium_render::prelude::PdfiumInternalError;
use tracing::debug;

use crate::Credential;
use crate::ExtractError;
use crate::Result;

use super::traits::PdfDocument;
use super::traits::PdfRenderer;

/// Renderer that binds pdfium lazily and keeps the binding for its
/// lifetime.
#[derive(Debug, Default)]
pub struct PdfiumRenderer {
    library: Option<PathBuf>,
    pdfium: OnceLock<std::result::Result<Pdfium, String>>,
}

impl PdfiumRenderer {
    /// Binds the system pdfium library on first use.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds pdfium from `path` on first use. A directory is searched for
    /// the platform's library file name.
    #[must_use]
    pub fn with_library(path: impl Into<PathBuf>) -> Self {
        Self {
            library: Some(path.into()),
            pdfium: OnceLock::new(),
        }
    }

    fn pdfium(&self) -> Result<&Pdfium> {
        let bound = self.pdfium.get_or_init(|| {
            let bindings = match &self.library {
                Some(path) if path.is_dir() => {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
                }
                Some(path) => Pdfium::bind_to_library(path),
                None => Pdfium::bind_to_system_library(),
            };
            bindings.map(Pdfium::new).map_err(|e| e.to_string())
        });

        bound.as_ref().map_err(|message| {
            ExtractError::unsupported(format!("pdfium library is not available: {message}"))
        })
    }
}

impl PdfRenderer for PdfiumRenderer {
    fn open<'a>(
        &'a self,
        source: &Path,
        credential: Option<&'a Credential>,
    ) -> Result<Box<dyn PdfDocument + 'a>> {
        let pdfium = self.pdfium()?;
        let document = pdfium
            .load_pdf_from_file(source, credential.map(Credential::expose))
            .map_err(|e| classify(e, credential.is_some()))?;

        debug!(pages = document.pages().len(), "opened pdf document");
        Ok(Box::new(PdfiumPages { document }))
    }
}

/// Open pdfium document. Dropping it closes the document.
struct PdfiumPages<'a> {
    document: PdfiumDocument<'a>,
}

impl PdfDocument for PdfiumPages<'_> {
    fn page_count(&self) -> usize {
        usize::from(self.document.pages().len())
    }

    fn is_encrypted(&self) -> Option<bool> {
        match self.document.permissions().security_handler_revision() {
            Ok(PdfSecurityHandlerRevision::Unprotected) => Some(false),
            Ok(_) => Some(true),
            Err(_) => None,
        }
    }

    fn render_page(&self, index: usize, scale: f32) -> Result<RgbaImage> {
        let page_index = u16::try_from(index)
            .map_err(|_| ExtractError::unknown(format!("page index {index} out of range")))?;
        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| render_failure(index, e))?;

        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| render_failure(index, e))?;

        let width = u32::try_from(bitmap.width()).unwrap_or(0);
        let height = u32::try_from(bitmap.height()).unwrap_or(0);
        RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes()).ok_or_else(|| {
            ExtractError::unknown(format!(
                "page {index} rendered to an unexpected pixel layout ({width}x{height})"
            ))
        })
    }
}

fn render_failure(index: usize, err: PdfiumError) -> ExtractError {
    ExtractError::unknown_with(format!("failed to render page {index}"), err)
}

/// Maps pdfium load errors onto the extraction taxonomy.
fn classify(err: PdfiumError, credential_given: bool) -> ExtractError {
    match err {
        PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError | PdfiumInternalError::SecurityError,
        ) => {
            if credential_given {
                ExtractError::wrong_credential(err)
            } else {
                ExtractError::credential_required()
            }
        }
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError) => {
            ExtractError::corrupt_with("invalid pdf document", err)
        }
        PdfiumError::IoError(io) => ExtractError::from(io),
        other => ExtractError::unknown_with("pdfium error", other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_missing_library_is_unsupported() {
        let temp = TempDir::new().unwrap();
        let renderer = PdfiumRenderer::with_library(temp.path().join("libnothing.so"));
        let pdf = temp.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-1.4\n").unwrap();

        let err = renderer.open(&pdf, None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Unsupported);

        // The failed binding is remembered.
        let err = renderer.open(&pdf, None).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_classify_password_errors() {
        let password = || PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError);

        assert_eq!(classify(password(), false).kind(), ErrorKind::WrongCredential);
        assert_eq!(classify(password(), true).kind(), ErrorKind::WrongCredential);
        assert_eq!(
            classify(
                PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError),
                false
            )
            .kind(),
            ErrorKind::Corrupt
        );
    }
}
