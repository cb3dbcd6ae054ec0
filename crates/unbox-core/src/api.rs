//! Free functions over a process-wide default [`Extractor`].

use std::path::Path;
use std::sync::OnceLock;

use crate::Credential;
use crate::ExtractError;
use crate::ExtractionReport;
use crate::Extractor;
use crate::Result;
use crate::formats::ArchiveKind;
use crate::types::ExtractionRequest;
use crate::types::ProtectionStatus;

fn shared() -> &'static Extractor {
    static SHARED: OnceLock<Extractor> = OnceLock::new();
    SHARED.get_or_init(Extractor::default)
}

/// Tells whether `source` needs a credential to be extracted.
///
/// # Errors
///
/// Returns `NotFound` if `source` does not exist, `Unsupported` for kinds
/// without an available collaborator and `Unknown` when the protection flag
/// could not be read.
///
/// # Examples
///
/// ```no_run
/// use unbox_core::ArchiveKind;
/// use unbox_core::probe_protection;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// if probe_protection(ArchiveKind::Zip, "archive.zip")? {
///     println!("archive.zip needs a password");
/// }
/// # Ok(())
/// # }
/// ```
pub fn probe_protection<P: AsRef<Path>>(kind: ArchiveKind, source: P) -> Result<bool> {
    let source = source.as_ref();
    match shared().probe(kind, source)? {
        ProtectionStatus::Protected => Ok(true),
        ProtectionStatus::Unprotected => Ok(false),
        ProtectionStatus::Indeterminate => Err(ExtractError::unknown(format!(
            "could not determine whether {} is protected",
            source.display()
        ))),
    }
}

/// Extracts `source` into `destination` without a credential.
///
/// # Errors
///
/// See [`Extractor::extract_with_progress`].
///
/// # Examples
///
/// ```no_run
/// use unbox_core::ArchiveKind;
/// use unbox_core::extract;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = extract(ArchiveKind::PdfPages, "slides.pdf", "slides")?;
/// println!("Rendered {} pages", report.pages_rendered);
/// # Ok(())
/// # }
/// ```
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(
    kind: ArchiveKind,
    source: P,
    destination: Q,
) -> Result<ExtractionReport> {
    let request = ExtractionRequest::new(kind, source.as_ref(), destination.as_ref());
    shared().execute(&request)
}

/// Extracts `source` into `destination`, unlocking it with `credential`.
///
/// The credential is ignored by containers that are not protected.
///
/// # Errors
///
/// See [`Extractor::extract_with_progress`].
pub fn extract_with_credential<P, Q, C>(
    kind: ArchiveKind,
    source: P,
    destination: Q,
    credential: C,
) -> Result<ExtractionReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    C: Into<Credential>,
{
    let request = ExtractionRequest::new(kind, source.as_ref(), destination.as_ref())
        .with_credential(credential);
    shared().execute(&request)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::test_utils::create_encrypted_zip;
    use crate::test_utils::create_test_zip;
    use tempfile::TempDir;

    #[test]
    fn test_probe_protection() {
        let temp = TempDir::new().unwrap();
        let plain = create_test_zip(temp.path(), "plain.zip", &[("a.txt", "a")]);
        let locked = create_encrypted_zip(temp.path(), "locked.zip", "pw", &[("a.txt", "a")]);

        assert!(!probe_protection(ArchiveKind::Zip, &plain).unwrap());
        assert!(probe_protection(ArchiveKind::Zip, &locked).unwrap());
    }

    #[test]
    fn test_extract_and_extract_with_credential() {
        let temp = TempDir::new().unwrap();
        let locked = create_encrypted_zip(temp.path(), "locked.zip", "pw", &[("a.txt", "secret")]);
        let dest = temp.path().join("out");

        let err = extract(ArchiveKind::Zip, &locked, &dest).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongCredential);

        let report = extract_with_credential(ArchiveKind::Zip, &locked, &dest, "pw").unwrap();
        assert_eq!(report.files_extracted, 1);
        assert_eq!(std::fs::read_to_string(dest.join("a.txt")).unwrap(), "secret");
    }
}
