//! Protection probe outcome.

use std::fmt;

/// Result of probing a container for credential protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtectionStatus {
    /// Content can be read without a credential.
    Unprotected,
    /// A credential is required to read content.
    Protected,
    /// The container opened but its protection flag could not be read.
    Indeterminate,
}

impl ProtectionStatus {
    /// Returns `true` only for [`ProtectionStatus::Protected`].
    #[must_use]
    pub const fn is_protected(self) -> bool {
        matches!(self, Self::Protected)
    }
}

impl fmt::Display for ProtectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unprotected => "unprotected",
            Self::Protected => "protected",
            Self::Indeterminate => "indeterminate",
        };
        f.write_str(text)
    }
}
