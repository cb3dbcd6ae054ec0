//! Page rasterization pipeline for pdf documents.

use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use image::DynamicImage;
use image::RgbaImage;
use image::codecs::jpeg::JpegEncoder;
use tracing::debug;

use crate::ExtractConfig;
use crate::ExtractError;
use crate::ExtractionReport;
use crate::ProgressCallback;
use crate::Result;
use crate::formats::PdfDocument;

use super::preflight::page_file_name;

/// Renders every page of `document` into `out_dir` as `{index}.jpg`.
///
/// Pages are rendered in order; the first failing page aborts the run.
pub fn render_pages(
    document: &dyn PdfDocument,
    out_dir: &Path,
    config: &ExtractConfig,
    report: &mut ExtractionReport,
    progress: &mut dyn ProgressCallback,
) -> Result<()> {
    let total = document.page_count();

    for index in 0..total {
        let name = page_file_name(index);
        let relative = Path::new(&name);
        progress.on_entry_start(relative, total, index + 1);

        let image = document.render_page(index, config.render_scale)?;
        let written = write_jpeg(image, &out_dir.join(relative), config.jpeg_quality)?;
        debug!(page = index, bytes = written, "rendered page");

        report.pages_rendered += 1;
        report.files_extracted += 1;
        report.bytes_written = report.bytes_written.saturating_add(written);
        progress.on_bytes_written(written);
        progress.on_entry_complete(relative);
    }

    Ok(())
}

/// Encodes `image` as a baseline JPEG at `quality` and writes it to a new
/// file at `path`. Returns the number of bytes written.
pub fn write_jpeg(image: RgbaImage, path: &Path, quality: u8) -> Result<u64> {
    let file = File::create_new(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            ExtractError::AlreadyExists {
                path: path.to_path_buf(),
            }
        } else {
            ExtractError::unknown_with(format!("failed to create {}", path.display()), e)
        }
    })?;

    let mut writer = BufWriter::new(file);
    let rgb = DynamicImage::ImageRgba8(image).into_rgb8();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))
        .map_err(|e| ExtractError::unknown_with(format!("failed to encode {}", path.display()), e))?;
    writer.flush()?;

    let file = writer
        .into_inner()
        .map_err(|e| ExtractError::from(e.into_error()))?;
    Ok(file.metadata()?.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::NoopProgress;
    use crate::formats::ArchiveKind;
    use crate::test_utils::MockPdfDocument;
    use image::Rgba;
    use tempfile::TempDir;

    const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

    #[test]
    fn test_write_jpeg() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("0.jpg");
        let image = RgbaImage::from_pixel(8, 4, Rgba([200, 10, 10, 255]));

        let written = write_jpeg(image, &path, 100).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(written, bytes.len() as u64);
        assert_eq!(&bytes[..2], &JPEG_SOI);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn test_write_jpeg_refuses_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("0.jpg");
        std::fs::write(&path, b"old").unwrap();

        let err = write_jpeg(RgbaImage::new(1, 1), &path, 90).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
    }

    #[test]
    fn test_render_pages_names_and_counts() {
        let temp = TempDir::new().unwrap();
        let document = MockPdfDocument::new(3);
        let mut report = ExtractionReport::new(ArchiveKind::PdfPages);

        render_pages(
            &document,
            temp.path(),
            &ExtractConfig::default(),
            &mut report,
            &mut NoopProgress,
        )
        .unwrap();

        assert_eq!(report.pages_rendered, 3);
        for name in ["0.jpg", "1.jpg", "2.jpg"] {
            assert!(temp.path().join(name).is_file(), "{name} missing");
        }
        assert!(!temp.path().join("3.jpg").exists());
    }

    #[test]
    fn test_render_pages_stops_at_failing_page() {
        let temp = TempDir::new().unwrap();
        let document = MockPdfDocument::new(4).failing_on_page(2);
        let mut report = ExtractionReport::new(ArchiveKind::PdfPages);

        let err = render_pages(
            &document,
            temp.path(),
            &ExtractConfig::default(),
            &mut report,
            &mut NoopProgress,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(report.pages_rendered, 2);
        assert!(!temp.path().join("2.jpg").exists());
        assert!(!temp.path().join("3.jpg").exists());
    }
}
