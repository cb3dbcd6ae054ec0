//! Per-call extraction request.

use std::path::Path;
use std::path::PathBuf;

use crate::Credential;
use crate::formats::ArchiveKind;

/// Everything a single extraction call needs.
///
/// Built by the caller and consumed by [`crate::Extractor::execute`]; nothing
/// in it outlives the call.
///
/// # Examples
///
/// ```
/// use unbox_core::ArchiveKind;
/// use unbox_core::ExtractionRequest;
///
/// let request = ExtractionRequest::new(ArchiveKind::Zip, "in.zip", "out").with_credential("pw");
/// assert!(request.credential().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    kind: ArchiveKind,
    source: PathBuf,
    destination: PathBuf,
    credential: Option<Credential>,
}

impl ExtractionRequest {
    /// Creates a request without a credential.
    pub fn new(
        kind: ArchiveKind,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            destination: destination.into(),
            credential: None,
        }
    }

    /// Attaches a credential.
    #[must_use]
    pub fn with_credential(mut self, credential: impl Into<Credential>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Replaces the credential, allowing `None`.
    #[must_use]
    pub fn with_optional_credential(mut self, credential: Option<Credential>) -> Self {
        self.credential = credential;
        self
    }

    /// Container kind.
    #[must_use]
    pub const fn kind(&self) -> ArchiveKind {
        self.kind
    }

    /// Source container path.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Destination directory path.
    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Credential, if one was supplied.
    #[must_use]
    pub const fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
}
