//! The extraction façade and its builder.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use tracing::debug;

use crate::Credential;
use crate::ExtractConfig;
use crate::ExtractError;
use crate::ExtractionReport;
use crate::NoopProgress;
use crate::ProgressCallback;
use crate::Result;
use crate::config::SevenZipBackend;
use crate::extraction::Staging;
use crate::extraction::check_collisions;
use crate::extraction::page_outputs;
use crate::extraction::render_pages;
use crate::formats::ArchiveCodec;
use crate::formats::ArchiveKind;
use crate::formats::PdfRenderer;
use crate::formats::SevenZCodec;
use crate::formats::SevenZipCommand;
use crate::formats::ZipCodec;
use crate::types::DestDir;
use crate::types::ExtractionRequest;
use crate::types::ProtectionStatus;

/// Probes and extracts containers of every supported kind.
///
/// An `Extractor` holds only its configuration and immutable collaborator
/// handles, so one instance can serve concurrent calls from many threads.
///
/// # Examples
///
/// ```no_run
/// use unbox_core::ArchiveKind;
/// use unbox_core::ExtractionRequest;
/// use unbox_core::Extractor;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = Extractor::builder().build()?;
/// let request = ExtractionRequest::new(ArchiveKind::Zip, "secret.zip", "out").with_credential("pw");
/// let report = extractor.execute(&request)?;
/// println!("Extracted {} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
pub struct Extractor {
    config: ExtractConfig,
    zip: Box<dyn ArchiveCodec>,
    rar: Option<Box<dyn ArchiveCodec>>,
    seven_zip: Box<dyn ArchiveCodec>,
    pdf: Option<Box<dyn PdfRenderer>>,
}

impl Extractor {
    /// Returns a builder starting from the default configuration.
    #[must_use]
    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::new()
    }

    /// Creates an extractor with the default collaborators for `config`.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` if the configuration is invalid.
    pub fn with_config(config: ExtractConfig) -> Result<Self> {
        ExtractorBuilder::new().config(config).build()
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Tells whether `source` needs a credential to be extracted.
    ///
    /// Reads only enough of the container to find out and never writes.
    /// For pdf documents the answer is an approximation: a document that
    /// opens without a password but carries a security handler is reported
    /// as protected.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `source` does not exist, `Unsupported` if no
    /// collaborator for `kind` is available and `Corrupt` or `Unknown` if
    /// the container cannot be read.
    pub fn probe(&self, kind: ArchiveKind, source: &Path) -> Result<ProtectionStatus> {
        ensure_source(source)?;
        debug!(%kind, source = %source.display(), "probing protection");

        let status = match kind {
            ArchiveKind::PdfPages => self.probe_pdf(source)?,
            _ => self.codec(kind)?.probe(source)?,
        };

        debug!(%kind, %status, "probe finished");
        Ok(status)
    }

    /// Extracts the request's source into its destination.
    ///
    /// # Errors
    ///
    /// See [`Extractor::extract_with_progress`].
    pub fn execute(&self, request: &ExtractionRequest) -> Result<ExtractionReport> {
        self.extract_with_progress(request, &mut NoopProgress)
    }

    /// Extracts the request's source into its destination, reporting
    /// progress per entry or page.
    ///
    /// The destination is created if missing. Output is staged inside it and
    /// only moved into place once the whole container has been decoded, so
    /// a failed call leaves the destination as it was.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the source does not exist; nothing is written.
    /// - `WrongCredential` if a required credential is missing or wrong.
    /// - `AlreadyExists` if any output is already present; nothing is
    ///   written.
    /// - `Corrupt` for decode failures attributable to the container.
    /// - `Unsupported` if no collaborator for the kind is available.
    /// - `Unknown` for everything else.
    pub fn extract_with_progress(
        &self,
        request: &ExtractionRequest,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let start = Instant::now();
        let kind = request.kind();
        let source = request.source();
        let credential = request.credential();

        ensure_source(source)?;
        debug!(
            %kind,
            source = %source.display(),
            destination = %request.destination().display(),
            credential = credential.is_some(),
            "extraction started"
        );

        let mut report = match kind {
            ArchiveKind::PdfPages => {
                self.extract_pages(source, request.destination(), credential, progress)?
            }
            _ => Self::extract_archive(
                self.codec(kind)?,
                source,
                request.destination(),
                credential,
                progress,
            )?,
        };

        report.duration = start.elapsed();
        progress.on_complete();
        debug!(
            %kind,
            files = report.files_extracted,
            directories = report.directories_created,
            bytes = report.bytes_written,
            duration_ms = report.duration.as_millis(),
            "extraction finished"
        );
        Ok(report)
    }

    fn codec(&self, kind: ArchiveKind) -> Result<&dyn ArchiveCodec> {
        match kind {
            ArchiveKind::Zip => Ok(&*self.zip),
            ArchiveKind::SevenZip => Ok(&*self.seven_zip),
            ArchiveKind::Rar => self
                .rar
                .as_deref()
                .ok_or_else(|| ExtractError::unsupported("rar support is not available")),
            ArchiveKind::PdfPages => Err(ExtractError::unsupported(
                "pdf documents are not archives",
            )),
        }
    }

    fn renderer(&self) -> Result<&dyn PdfRenderer> {
        self.pdf
            .as_deref()
            .ok_or_else(|| ExtractError::unsupported("pdf rendering is not available"))
    }

    fn probe_pdf(&self, source: &Path) -> Result<ProtectionStatus> {
        match self.renderer()?.open(source, None) {
            Ok(document) => Ok(match document.is_encrypted() {
                Some(true) => ProtectionStatus::Protected,
                Some(false) => ProtectionStatus::Unprotected,
                None => ProtectionStatus::Indeterminate,
            }),
            Err(e) if e.is_credential_error() => Ok(ProtectionStatus::Protected),
            Err(e) => Err(e),
        }
    }

    fn extract_archive(
        codec: &dyn ArchiveCodec,
        source: &Path,
        destination: &Path,
        credential: Option<&Credential>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let expected = codec.entries(source, credential)?;
        let dest = DestDir::prepare(destination)?;
        if let Some(expected) = expected {
            check_collisions(dest.as_path(), expected)?;
        }

        let staging = Staging::create(&dest)?;
        let mut report = codec.extract_all(source, staging.path(), credential, progress)?;
        let summary = staging.commit()?;
        summary.apply_to(&mut report);
        Ok(report)
    }

    fn extract_pages(
        &self,
        source: &Path,
        destination: &Path,
        credential: Option<&Credential>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ExtractionReport> {
        let document = self.renderer()?.open(source, credential)?;
        let dest = DestDir::prepare(destination)?;
        check_collisions(dest.as_path(), page_outputs(document.page_count()))?;

        let staging = Staging::create(&dest)?;
        let mut report = ExtractionReport::new(ArchiveKind::PdfPages);
        render_pages(
            document.as_ref(),
            staging.path(),
            &self.config,
            &mut report,
            progress,
        )?;
        drop(document);

        let summary = staging.commit()?;
        summary.apply_to(&mut report);
        Ok(report)
    }
}

impl Default for Extractor {
    /// Extractor with [`ExtractConfig::default`] and the default
    /// collaborators.
    fn default() -> Self {
        ExtractorBuilder::new().assemble()
    }
}

impl fmt::Debug for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extractor")
            .field("config", &self.config)
            .field("rar", &self.rar.is_some())
            .field("pdf", &self.pdf.is_some())
            .finish_non_exhaustive()
    }
}

fn ensure_source(source: &Path) -> Result<()> {
    match source.try_exists() {
        Ok(true) => Ok(()),
        Ok(false) => Err(ExtractError::NotFound {
            path: source.to_path_buf(),
        }),
        Err(e) => Err(ExtractError::unknown_with(
            format!("cannot access {}", source.display()),
            e,
        )),
    }
}

/// Builder for [`Extractor`].
///
/// Collaborators that are not set explicitly are chosen from the
/// configuration and the enabled cargo features.
///
/// # Examples
///
/// ```
/// use unbox_core::ExtractConfig;
/// use unbox_core::Extractor;
/// use unbox_core::SevenZipBackend;
///
/// let extractor = Extractor::builder()
///     .config(ExtractConfig::default().with_seven_zip_backend(SevenZipBackend::command()))
///     .build()
///     .unwrap();
/// assert_eq!(extractor.config().jpeg_quality, 100);
/// ```
#[derive(Default)]
pub struct ExtractorBuilder {
    config: ExtractConfig,
    zip: Option<Box<dyn ArchiveCodec>>,
    rar: Option<Box<dyn ArchiveCodec>>,
    seven_zip: Option<Box<dyn ArchiveCodec>>,
    pdf: Option<Box<dyn PdfRenderer>>,
}

impl ExtractorBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: ExtractConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the zip collaborator.
    #[must_use]
    pub fn zip_codec(mut self, codec: impl ArchiveCodec + 'static) -> Self {
        self.zip = Some(Box::new(codec));
        self
    }

    /// Replaces the rar collaborator.
    #[must_use]
    pub fn rar_codec(mut self, codec: impl ArchiveCodec + 'static) -> Self {
        self.rar = Some(Box::new(codec));
        self
    }

    /// Replaces the 7z collaborator, overriding the configured backend.
    #[must_use]
    pub fn seven_zip_codec(mut self, codec: impl ArchiveCodec + 'static) -> Self {
        self.seven_zip = Some(Box::new(codec));
        self
    }

    /// Replaces the pdf renderer.
    #[must_use]
    pub fn pdf_renderer(mut self, renderer: impl PdfRenderer + 'static) -> Self {
        self.pdf = Some(Box::new(renderer));
        self
    }

    /// Validates the configuration and builds the extractor.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` if the configuration is invalid.
    pub fn build(self) -> Result<Extractor> {
        self.config.validate()?;
        Ok(self.assemble())
    }

    fn assemble(self) -> Extractor {
        let zip: Box<dyn ArchiveCodec> = match self.zip {
            Some(codec) => codec,
            None => Box::new(ZipCodec::new()),
        };
        let seven_zip: Box<dyn ArchiveCodec> = match self.seven_zip {
            Some(codec) => codec,
            None => match &self.config.seven_zip_backend {
                SevenZipBackend::Native => Box::new(SevenZCodec::new()),
                SevenZipBackend::Command { binary } => {
                    Box::new(SevenZipCommand::new(binary.clone()))
                }
            },
        };

        Extractor {
            zip,
            rar: self.rar.or_else(default_rar),
            seven_zip,
            pdf: self.pdf.or_else(|| default_pdf(&self.config)),
            config: self.config,
        }
    }
}

impl fmt::Debug for ExtractorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(feature = "rar")]
fn default_rar() -> Option<Box<dyn ArchiveCodec>> {
    Some(Box::new(crate::formats::RarCodec::new()))
}

#[cfg(not(feature = "rar"))]
fn default_rar() -> Option<Box<dyn ArchiveCodec>> {
    None
}

#[cfg(feature = "pdfium")]
fn default_pdf(config: &ExtractConfig) -> Option<Box<dyn PdfRenderer>> {
    use crate::formats::PdfiumRenderer;

    let renderer = match &config.pdfium_library {
        Some(path) => PdfiumRenderer::with_library(path.clone()),
        None => PdfiumRenderer::new(),
    };
    Some(Box::new(renderer))
}

#[cfg(not(feature = "pdfium"))]
fn default_pdf(_config: &ExtractConfig) -> Option<Box<dyn PdfRenderer>> {
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::test_utils::MockCodec;
    use crate::test_utils::MockPdfRenderer;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn source(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("input.bin");
        std::fs::write(&path, b"placeholder").unwrap();
        path
    }

    #[test]
    fn test_extractor_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Extractor>();
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let err = Extractor::builder()
            .config(ExtractConfig::default().with_jpeg_quality(0))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_probe_missing_source() {
        let temp = TempDir::new().unwrap();
        let extractor = Extractor::default();

        for kind in ArchiveKind::ALL {
            let err = extractor
                .probe(kind, &temp.path().join("missing"))
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound, "{kind}");
        }
    }

    #[test]
    fn test_probe_uses_injected_codec() {
        let temp = TempDir::new().unwrap();
        let extractor = Extractor::builder()
            .rar_codec(MockCodec::new(ArchiveKind::Rar, &[("a", "a")]).with_password("pw"))
            .build()
            .unwrap();

        assert_eq!(
            extractor.probe(ArchiveKind::Rar, &source(temp.path())).unwrap(),
            ProtectionStatus::Protected
        );
    }

    #[test]
    fn test_probe_pdf_states() {
        let temp = TempDir::new().unwrap();
        let src = source(temp.path());

        let locked = Extractor::builder()
            .pdf_renderer(MockPdfRenderer::new(1).with_password("pw"))
            .build()
            .unwrap();
        assert_eq!(
            locked.probe(ArchiveKind::PdfPages, &src).unwrap(),
            ProtectionStatus::Protected
        );

        let plain = Extractor::builder()
            .pdf_renderer(MockPdfRenderer::new(1))
            .build()
            .unwrap();
        assert_eq!(
            plain.probe(ArchiveKind::PdfPages, &src).unwrap(),
            ProtectionStatus::Unprotected
        );

        let unknown = Extractor::builder()
            .pdf_renderer(MockPdfRenderer::new(1).reporting_encrypted(None))
            .build()
            .unwrap();
        assert_eq!(
            unknown.probe(ArchiveKind::PdfPages, &src).unwrap(),
            ProtectionStatus::Indeterminate
        );
    }

    #[test]
    fn test_missing_source_creates_no_destination() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("out");
        let request = ExtractionRequest::new(ArchiveKind::Zip, temp.path().join("nope.zip"), &dest);

        let err = Extractor::default().execute(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!dest.exists());
    }

    #[test]
    fn test_extract_creates_destination() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("nested/out");
        let extractor = Extractor::builder()
            .seven_zip_codec(MockCodec::new(ArchiveKind::SevenZip, &[("a.txt", "a")]))
            .build()
            .unwrap();
        let request = ExtractionRequest::new(ArchiveKind::SevenZip, source(temp.path()), &dest);

        let report = extractor.execute(&request).unwrap();
        assert_eq!(report.files_extracted, 1);
        assert_eq!(std::fs::read_to_string(dest.join("a.txt")).unwrap(), "a");
    }

    #[test]
    fn test_pdf_report_counts_pages() {
        let temp = TempDir::new().unwrap();
        let extractor = Extractor::builder()
            .pdf_renderer(MockPdfRenderer::new(2))
            .build()
            .unwrap();
        let request =
            ExtractionRequest::new(ArchiveKind::PdfPages, source(temp.path()), temp.path().join("out"));

        let report = extractor.execute(&request).unwrap();
        assert_eq!(report.kind, ArchiveKind::PdfPages);
        assert_eq!(report.pages_rendered, 2);
        assert_eq!(report.files_extracted, 2);
        assert_eq!(report.directories_created, 0);
    }

    #[test]
    #[traced_test]
    fn test_logs_never_contain_credential() {
        let temp = TempDir::new().unwrap();
        let extractor = Extractor::builder()
            .zip_codec(MockCodec::new(ArchiveKind::Zip, &[("a.txt", "a")]).with_password("s3cr3t-pw"))
            .build()
            .unwrap();
        let request = ExtractionRequest::new(ArchiveKind::Zip, source(temp.path()), temp.path().join("out"))
            .with_credential("s3cr3t-pw");

        extractor.execute(&request).unwrap();

        assert!(logs_contain("extraction started"));
        assert!(logs_contain("extraction finished"));
        assert!(!logs_contain("s3cr3t-pw"));
    }
}
