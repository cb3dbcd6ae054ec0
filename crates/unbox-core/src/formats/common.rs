//! Common extraction utilities shared between archive codecs.
//!
//! # Functions
//!
//! - [`entry_path`]: Turns an archive entry name into a safe relative path
//! - [`extract_file`]: Buffered file write below a staging root
//! - [`create_directory`]: Directory creation (idempotent)
//! - [`TrackingReader`]: Remembers the first read failure of an entry stream

use std::fs::File;
use std::fs::create_dir_all;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::ExtractError;
use crate::ExtractionReport;
use crate::Result;

/// Converts an entry name stored in an archive into a relative path.
///
/// Backslashes are treated as separators. `.` components are dropped.
///
/// # Errors
///
/// Returns `Corrupt` for empty names, absolute names and names containing
/// `..`, since writing them would escape the destination.
pub fn entry_path(name: &str) -> Result<PathBuf> {
    let normalized = name.replace('\\', "/");
    let mut path = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::corrupt(format!(
                    "entry name escapes the destination: {name}"
                )));
            }
        }
    }

    if path.as_os_str().is_empty() {
        return Err(ExtractError::corrupt(format!("invalid entry name: '{name}'")));
    }

    Ok(path)
}

/// Writes one regular file below `root` and updates the report.
///
/// The file must not exist yet. Returns the number of bytes written.
pub fn extract_file<R: Read + ?Sized>(
    reader: &mut R,
    root: &Path,
    relative: &Path,
    report: &mut ExtractionReport,
) -> Result<u64> {
    let output_path = root.join(relative);

    if let Some(parent) = output_path.parent() {
        create_dir_all(parent)?;
    }

    let output_file = File::create_new(&output_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            ExtractError::corrupt(format!("duplicate entry: {}", relative.display()))
        } else {
            ExtractError::from(e)
        }
    })?;
    let mut writer = BufWriter::with_capacity(64 * 1024, output_file);
    let bytes_written = std::io::copy(reader, &mut writer)?;
    writer.flush()?;

    report.files_extracted += 1;
    report.bytes_written = report.bytes_written.saturating_add(bytes_written);

    Ok(bytes_written)
}

/// Creates a directory entry below `root`.
///
/// Idempotent: repeated entries for one directory count once.
pub fn create_directory(root: &Path, relative: &Path, report: &mut ExtractionReport) -> Result<()> {
    let dir_path = root.join(relative);
    if !dir_path.is_dir() {
        create_dir_all(&dir_path)?;
        report.directories_created += 1;
    }
    Ok(())
}

/// Reader that remembers the first error of the wrapped entry stream.
///
/// Lets a codec tell a failure to decode an entry apart from a failure to
/// write its output.
pub struct TrackingReader<R> {
    inner: R,
    read_error: Option<std::io::Error>,
}

impl<R: Read> TrackingReader<R> {
    /// Wraps `inner`.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            read_error: None,
        }
    }

    /// Takes the first read error seen so far, if any.
    pub fn take_error(&mut self) -> Option<std::io::Error> {
        self.read_error.take()
    }
}

impl<R: Read> Read for TrackingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf).inspect_err(|e| {
            if self.read_error.is_none() {
                self.read_error = Some(std::io::Error::new(e.kind(), e.to_string()));
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::formats::ArchiveKind;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn test_entry_path_normalizes() {
        assert_eq!(entry_path("a/b/c.txt").unwrap(), PathBuf::from("a/b/c.txt"));
        assert_eq!(entry_path("./a/./b").unwrap(), PathBuf::from("a/b"));
        assert_eq!(entry_path("dir\\file.txt").unwrap(), PathBuf::from("dir/file.txt"));
        assert_eq!(entry_path("dir/").unwrap(), PathBuf::from("dir"));
    }

    #[test]
    fn test_entry_path_rejects_escapes() {
        for name in ["../evil", "a/../../evil", "/etc/passwd", "", "./"] {
            let err = entry_path(name).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Corrupt, "name {name:?}");
        }
    }

    #[test]
    fn test_extract_file_creates_parents() {
        let temp = TempDir::new().unwrap();
        let mut report = ExtractionReport::new(ArchiveKind::Zip);
        let mut reader = Cursor::new(b"hello".to_vec());

        let written =
            extract_file(&mut reader, temp.path(), Path::new("a/b/c.txt"), &mut report).unwrap();

        assert_eq!(written, 5);
        assert_eq!(report.files_extracted, 1);
        assert_eq!(report.bytes_written, 5);
        assert_eq!(
            std::fs::read(temp.path().join("a/b/c.txt")).unwrap(),
            b"hello"
        );
    }

    #[test]
    fn test_extract_file_duplicate_entry() {
        let temp = TempDir::new().unwrap();
        let mut report = ExtractionReport::new(ArchiveKind::Zip);

        extract_file(&mut Cursor::new(b"1"), temp.path(), Path::new("x"), &mut report).unwrap();
        let err = extract_file(&mut Cursor::new(b"2"), temp.path(), Path::new("x"), &mut report)
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Corrupt);
        assert_eq!(std::fs::read(temp.path().join("x")).unwrap(), b"1");
    }

    #[test]
    fn test_create_directory_idempotent() {
        let temp = TempDir::new().unwrap();
        let mut report = ExtractionReport::new(ArchiveKind::SevenZip);

        create_directory(temp.path(), Path::new("d/e"), &mut report).unwrap();
        create_directory(temp.path(), Path::new("d/e"), &mut report).unwrap();

        assert!(temp.path().join("d/e").is_dir());
        assert_eq!(report.directories_created, 1);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "bad stream"))
        }
    }

    #[test]
    fn test_tracking_reader_keeps_read_error() {
        let temp = TempDir::new().unwrap();
        let mut report = ExtractionReport::new(ArchiveKind::Zip);
        let mut reader = TrackingReader::new(FailingReader);

        let err = extract_file(&mut reader, temp.path(), Path::new("x"), &mut report).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);

        let read_error = reader.take_error().unwrap();
        assert_eq!(read_error.kind(), std::io::ErrorKind::InvalidData);
        assert!(reader.take_error().is_none());
    }

    #[test]
    fn test_tracking_reader_passes_data_through() {
        let mut reader = TrackingReader::new(Cursor::new(b"abc".to_vec()));
        let mut out = Vec::new();

        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abc");
        assert!(reader.take_error().is_none());
    }
}
