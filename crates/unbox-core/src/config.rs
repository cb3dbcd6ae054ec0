//! Extraction configuration.

use std::path::PathBuf;

use crate::ExtractError;
use crate::Result;

/// Default JPEG quality for rendered pdf pages.
pub const DEFAULT_JPEG_QUALITY: u8 = 100;

/// Largest accepted page scale factor.
pub const MAX_RENDER_SCALE: f32 = 16.0;

/// Which collaborator handles 7z archives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SevenZipBackend {
    /// In-process decoder.
    #[default]
    Native,
    /// External `7z` binary driven through its command line.
    Command {
        /// Binary to execute, resolved through `PATH` when relative.
        binary: PathBuf,
    },
}

impl SevenZipBackend {
    /// Command backend using `7z` from `PATH`.
    #[must_use]
    pub fn command() -> Self {
        Self::Command {
            binary: PathBuf::from("7z"),
        }
    }
}

/// Extraction configuration.
///
/// # Examples
///
/// ```
/// use unbox_core::ExtractConfig;
///
/// // Defaults: JPEG quality 100, page scale 1.0, in-process 7z decoder
/// let config = ExtractConfig::default();
/// assert_eq!(config.jpeg_quality, 100);
///
/// let custom = ExtractConfig::default().with_jpeg_quality(85).with_render_scale(2.0);
/// assert!(custom.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    /// JPEG quality of rendered pdf pages, 1 to 100.
    pub jpeg_quality: u8,

    /// Factor applied to a page's size in points to get its raster size.
    pub render_scale: f32,

    /// Collaborator used for 7z archives.
    pub seven_zip_backend: SevenZipBackend,

    /// Directory or file of the pdfium shared library. `None` binds the
    /// system library.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for ExtractConfig {
    /// Default values:
    /// - `jpeg_quality`: 100
    /// - `render_scale`: 1.0
    /// - `seven_zip_backend`: `Native`
    /// - `pdfium_library`: `None`
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            render_scale: 1.0,
            seven_zip_backend: SevenZipBackend::Native,
            pdfium_library: None,
        }
    }
}

impl ExtractConfig {
    /// Sets the JPEG quality.
    #[must_use]
    pub const fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Sets the page scale factor.
    #[must_use]
    pub const fn with_render_scale(mut self, scale: f32) -> Self {
        self.render_scale = scale;
        self
    }

    /// Selects the 7z collaborator.
    #[must_use]
    pub fn with_seven_zip_backend(mut self, backend: SevenZipBackend) -> Self {
        self.seven_zip_backend = backend;
        self
    }

    /// Binds pdfium from the given location instead of the system library.
    #[must_use]
    pub fn with_pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdfium_library = Some(path.into());
        self
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` naming the first invalid setting.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ExtractError::unsupported(format!(
                "jpeg quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }

        if !self.render_scale.is_finite()
            || self.render_scale <= 0.0
            || self.render_scale > MAX_RENDER_SCALE
        {
            return Err(ExtractError::unsupported(format!(
                "render scale must be in (0, {MAX_RENDER_SCALE}], got {}",
                self.render_scale
            )));
        }

        if let SevenZipBackend::Command { binary } = &self.seven_zip_backend
            && binary.as_os_str().is_empty()
        {
            return Err(ExtractError::unsupported("7z binary path is empty"));
        }

        Ok(())
    }
}
