//! Capability traits implemented by decode and render collaborators.

use std::path::Path;
use std::path::PathBuf;

use image::RgbaImage;

use crate::Credential;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::formats::ArchiveKind;
use crate::types::ProtectionStatus;

/// Decoder for one archive kind (zip, rar or 7z).
///
/// Implementations classify their library's failures into
/// [`crate::ExtractError`] kinds and release every handle they open before
/// returning, on success and on failure alike.
pub trait ArchiveCodec: Send + Sync {
    /// Kind of container this codec decodes.
    fn kind(&self) -> ArchiveKind;

    /// Reads just enough of `source` to tell whether a credential is needed.
    fn probe(&self, source: &Path) -> Result<ProtectionStatus>;

    /// Lists the relative paths of the regular files the archive would
    /// produce, or `None` when the codec cannot list without extracting.
    fn entries(&self, source: &Path, credential: Option<&Credential>)
    -> Result<Option<Vec<PathBuf>>>;

    /// Extracts every entry of `source` below `dest`.
    ///
    /// `dest` is an empty staging directory owned by the caller.
    fn extract_all(
        &self,
        source: &Path,
        dest: &Path,
        credential: Option<&Credential>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport>;
}

/// Opens pdf documents for page rendering.
pub trait PdfRenderer: Send + Sync {
    /// Opens `source`, unlocking it with `credential` when given.
    ///
    /// A document that needs a credential which was not supplied, or was
    /// supplied wrong, fails with `WrongCredential`.
    fn open<'a>(
        &'a self,
        source: &Path,
        credential: Option<&'a Credential>,
    ) -> Result<Box<dyn PdfDocument + 'a>>;
}

/// An open pdf document. Dropping it releases the native handle.
pub trait PdfDocument {
    /// Number of pages.
    fn page_count(&self) -> usize;

    /// Whether the document carries a security handler. `None` when the
    /// handler could not be read.
    fn is_encrypted(&self) -> Option<bool>;

    /// Rasterizes the zero-based page `index` at `scale` times its size in
    /// points.
    fn render_page(&self, index: usize, scale: f32) -> Result<RgbaImage>;
}
