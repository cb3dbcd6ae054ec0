//! Extraction operation reporting.

use std::path::Path;
use std::time::Duration;

use crate::formats::ArchiveKind;

/// Report of a successful extraction.
///
/// Carries statistics only; a failed extraction never produces one.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// Kind of container that was extracted.
    pub kind: ArchiveKind,

    /// Number of files written to the destination.
    pub files_extracted: usize,

    /// Number of directories created in the destination.
    pub directories_created: usize,

    /// Number of pdf pages rendered. Zero for archive kinds.
    pub pages_rendered: usize,

    /// Total bytes written to disk.
    pub bytes_written: u64,

    /// Duration of the extraction operation.
    pub duration: Duration,

    /// Non-fatal issues encountered, such as failing to remove a staging
    /// directory.
    pub warnings: Vec<String>,
}

impl ExtractionReport {
    /// Creates a new empty report for the given kind.
    #[must_use]
    pub fn new(kind: ArchiveKind) -> Self {
        Self {
            kind,
            files_extracted: 0,
            directories_created: 0,
            pages_rendered: 0,
            bytes_written: 0,
            duration: Duration::ZERO,
            warnings: Vec::new(),
        }
    }

    /// Adds a warning message to the report.
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// Callback trait for progress reporting during extraction.
///
/// The trait requires `Send` so that a callback can be moved to the thread
/// running the extraction.
///
/// # Examples
///
/// ```
/// use unbox_core::ProgressCallback;
/// use std::path::Path;
///
/// struct SimpleProgress;
///
/// impl ProgressCallback for SimpleProgress {
///     fn on_entry_start(&mut self, path: &Path, total: usize, current: usize) {
///         println!("Processing {}/{}: {}", current, total, path.display());
///     }
///
///     fn on_bytes_written(&mut self, bytes: u64) {}
///
///     fn on_entry_complete(&mut self, path: &Path) {
///         println!("Completed: {}", path.display());
///     }
///
///     fn on_complete(&mut self) {
///         println!("Extraction complete");
///     }
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called when starting to process an entry or page.
    ///
    /// # Arguments
    ///
    /// * `path` - Output path of the entry, relative to the destination
    /// * `total` - Total number of entries, or 0 when unknown
    /// * `current` - Current entry number (1-indexed)
    fn on_entry_start(&mut self, path: &Path, total: usize, current: usize);

    /// Called when bytes are written.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called when an entry has been completely written.
    fn on_entry_complete(&mut self, path: &Path);

    /// Called once after output has been committed to the destination.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry_start(&mut self, _path: &Path, _total: usize, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_entry_complete(&mut self, _path: &Path) {}

    fn on_complete(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report() {
        let report = ExtractionReport::new(ArchiveKind::Zip);
        assert_eq!(report.kind, ArchiveKind::Zip);
        assert_eq!(report.files_extracted, 0);
        assert_eq!(report.pages_rendered, 0);
        assert_eq!(report.duration, Duration::ZERO);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_add_warning() {
        let mut report = ExtractionReport::new(ArchiveKind::Rar);
        report.add_warning("staging directory left behind".to_string());
        assert_eq!(report.warnings, ["staging directory left behind"]);
    }
}
