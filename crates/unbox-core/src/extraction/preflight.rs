//! Collision checks performed before anything is written.

use std::path::Path;
use std::path::PathBuf;

use crate::ExtractError;
use crate::Result;

/// File name of the rendered image of zero-based page `index`.
///
/// # Examples
///
/// ```
/// use unbox_core::extraction::page_file_name;
///
/// assert_eq!(page_file_name(0), "0.jpg");
/// assert_eq!(page_file_name(12), "12.jpg");
/// ```
#[must_use]
pub fn page_file_name(index: usize) -> String {
    format!("{index}.jpg")
}

/// Relative output paths of a document with `count` pages.
pub fn page_outputs(count: usize) -> impl Iterator<Item = PathBuf> {
    (0..count).map(|index| PathBuf::from(page_file_name(index)))
}

/// Fails with `AlreadyExists` on the first expected output that is already
/// present in `dest`.
pub fn check_collisions<I>(dest: &Path, expected: I) -> Result<()>
where
    I: IntoIterator<Item = PathBuf>,
{
    for relative in expected {
        let target = dest.join(&relative);
        if target.symlink_metadata().is_ok() {
            return Err(ExtractError::AlreadyExists { path: target });
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_page_outputs() {
        let names: Vec<PathBuf> = page_outputs(3).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("0.jpg"),
                PathBuf::from("1.jpg"),
                PathBuf::from("2.jpg")
            ]
        );
        assert_eq!(page_outputs(0).count(), 0);
    }

    #[test]
    fn test_no_collision() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("unrelated.txt"), b"x").unwrap();

        assert!(check_collisions(temp.path(), page_outputs(2)).is_ok());
    }

    #[test]
    fn test_collision_reports_first_existing_path() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("1.jpg"), b"old").unwrap();

        let err = check_collisions(temp.path(), page_outputs(3)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        match err {
            ExtractError::AlreadyExists { path } => assert_eq!(path, temp.path().join("1.jpg")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_existing_directory_counts_as_collision() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("0.jpg")).unwrap();

        assert!(check_collisions(temp.path(), page_outputs(1)).is_err());
    }
}
