//! Validated destination directory type.

use crate::ExtractError;
use crate::Result;
use std::path::Path;
use std::path::PathBuf;

/// A destination directory that exists and is represented by its canonical
/// absolute path.
///
/// Staging directories are created inside it, so committing staged output is
/// a same-filesystem rename.
///
/// # Examples
///
/// ```no_run
/// use unbox_core::types::DestDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dest = DestDir::prepare("/tmp/extraction")?;
/// println!("Extracting to: {}", dest.as_path().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestDir(PathBuf);

impl DestDir {
    /// Validates an existing destination directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist, is not a directory, or
    /// cannot be canonicalized.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            ExtractError::unknown_with(
                format!("destination directory is not accessible: {}", path.display()),
                e,
            )
        })?;

        if !metadata.is_dir() {
            return Err(ExtractError::unknown(format!(
                "destination is not a directory: {}",
                path.display()
            )));
        }

        let canonical = path.canonicalize().map_err(|e| {
            ExtractError::unknown_with(
                format!("failed to canonicalize path {}", path.display()),
                e,
            )
        })?;

        Ok(Self(canonical))
    }

    /// Creates the destination directory (and parents) when missing, then
    /// validates it like [`DestDir::new`].
    pub fn prepare(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            std::fs::create_dir_all(&path).map_err(|e| {
                ExtractError::unknown_with(
                    format!("failed to create destination {}", path.display()),
                    e,
                )
            })?;
        }
        Self::new(path)
    }

    /// Returns the path as a `&Path`.
    #[inline]
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_dest_dir_valid() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let dest = DestDir::new(temp.path()).expect("dest should be valid");
        assert!(dest.as_path().is_absolute());
    }

    #[test]
    fn test_dest_dir_nonexistent() {
        let result = DestDir::new("/nonexistent/directory/that/does/not/exist");
        assert!(matches!(result, Err(ExtractError::Unknown { .. })));
    }

    #[test]
    fn test_dest_dir_not_a_directory() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let file_path = temp.path().join("file.txt");
        fs::write(&file_path, "test").expect("failed to write file");

        let err = DestDir::prepare(&file_path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.to_string().contains("not a directory"));
    }

    #[test]
    fn test_prepare_creates_missing_directories() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let nested = temp.path().join("a").join("b").join("c");

        let dest = DestDir::prepare(&nested).expect("should create nested dirs");
        assert!(nested.is_dir());
        assert_eq!(dest.as_path(), nested.canonicalize().unwrap());
    }

    #[test]
    fn test_dest_dir_canonicalization() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let subdir = temp.path().join("subdir");
        fs::create_dir(&subdir).expect("failed to create subdir");

        let dest = DestDir::new(subdir.join(".").join("..")).expect("should create dest dir");
        assert_eq!(dest.as_path(), temp.path().canonicalize().unwrap());
    }
}
