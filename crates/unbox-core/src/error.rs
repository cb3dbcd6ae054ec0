//! Error types for extraction and probing operations.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ExtractError`.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Boxed underlying cause reported by a collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Closed classification of every failure the façade can report.
///
/// Callers match on this instead of inspecting error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The source container does not exist.
    NotFound,
    /// A required credential was omitted or did not unlock the container.
    WrongCredential,
    /// The destination already holds a file this call would produce.
    AlreadyExists,
    /// The collaborator reported a decode failure it could attribute to the
    /// container's contents.
    Corrupt,
    /// The container kind, feature or collaborator is not available.
    Unsupported,
    /// Any other failure.
    Unknown,
}

impl ErrorKind {
    /// Returns a stable lowercase identifier for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::WrongCredential => "wrong_credential",
            Self::AlreadyExists => "already_exists",
            Self::Corrupt => "corrupt",
            Self::Unsupported => "unsupported",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while probing or extracting a container.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Source container does not exist.
    #[error("source not found: {}", path.display())]
    NotFound {
        /// The missing source path.
        path: PathBuf,
    },

    /// Credential missing or rejected by the collaborator.
    #[error("{message}")]
    WrongCredential {
        /// Human readable description.
        message: String,
        /// Underlying collaborator error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// An output artifact already exists in the destination.
    #[error("output already exists: {}", path.display())]
    AlreadyExists {
        /// First colliding destination path.
        path: PathBuf,
    },

    /// Container is damaged or malformed.
    #[error("corrupt container: {message}")]
    Corrupt {
        /// Human readable description.
        message: String,
        /// Underlying collaborator error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Container kind, option or collaborator is not supported.
    #[error("unsupported: {message}")]
    Unsupported {
        /// Human readable description.
        message: String,
    },

    /// Unclassified failure.
    #[error("{message}")]
    Unknown {
        /// Human readable description.
        message: String,
        /// Underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },
}

impl ExtractError {
    /// Credential required but none was supplied.
    #[must_use]
    pub fn credential_required() -> Self {
        Self::WrongCredential {
            message: "container is protected and no credential was supplied".into(),
            source: None,
        }
    }

    /// Supplied credential did not unlock the container.
    pub fn wrong_credential(source: impl Into<BoxError>) -> Self {
        Self::WrongCredential {
            message: "credential rejected".into(),
            source: Some(source.into()),
        }
    }

    /// Builds a `Corrupt` error without an underlying cause.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a `Corrupt` error wrapping a collaborator error.
    pub fn corrupt_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Corrupt {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Builds an `Unsupported` error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }

    /// Builds an `Unknown` error without an underlying cause.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an `Unknown` error wrapping another error.
    pub fn unknown_with(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Unknown {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the taxonomy entry of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use unbox_core::ErrorKind;
    /// use unbox_core::ExtractError;
    ///
    /// let err = ExtractError::credential_required();
    /// assert_eq!(err.kind(), ErrorKind::WrongCredential);
    /// ```
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::WrongCredential { .. } => ErrorKind::WrongCredential,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Corrupt { .. } => ErrorKind::Corrupt,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Returns `true` if supplying a (different) credential could change the
    /// outcome.
    #[must_use]
    pub const fn is_credential_error(&self) -> bool {
        matches!(self, Self::WrongCredential { .. })
    }
}

/// I/O failures outside a collaborator are unclassified.
impl From<std::io::Error> for ExtractError {
    fn from(err: std::io::Error) -> Self {
        Self::Unknown {
            message: format!("I/O error: {err}"),
            source: Some(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err = ExtractError::NotFound {
            path: PathBuf::from("missing.zip"),
        };
        assert_eq!(err.to_string(), "source not found: missing.zip");

        let err = ExtractError::unsupported("pdf renderer unavailable");
        assert_eq!(err.to_string(), "unsupported: pdf renderer unavailable");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            ExtractError::NotFound {
                path: PathBuf::from("a")
            }
            .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ExtractError::credential_required().kind(),
            ErrorKind::WrongCredential
        );
        assert_eq!(
            ExtractError::AlreadyExists {
                path: PathBuf::from("0.jpg")
            }
            .kind(),
            ErrorKind::AlreadyExists
        );
        assert_eq!(ExtractError::corrupt("bad").kind(), ErrorKind::Corrupt);
        assert_eq!(ExtractError::unknown("x").kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(ErrorKind::WrongCredential.as_str(), "wrong_credential");
        assert_eq!(ErrorKind::AlreadyExists.to_string(), "already_exists");
    }

    #[test]
    fn test_io_error_conversion_keeps_cause() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ExtractError = io_err.into();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.to_string().contains("denied"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_wrong_credential_source_chain() {
        let inner = std::io::Error::other("bad password");
        let err = ExtractError::wrong_credential(inner);
        assert!(err.is_credential_error());
        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("bad password"));
    }

    #[test]
    fn test_corrupt_without_source() {
        let err = ExtractError::corrupt("truncated header");
        assert!(err.source().is_none());
        assert!(!err.is_credential_error());
        assert!(err.to_string().contains("truncated header"));
    }
}
