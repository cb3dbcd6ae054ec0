//! Secret credential wrapper.

use std::fmt;

/// Password or passphrase that unlocks a protected container.
///
/// The value is never printed: `Debug` is redacted and there is no `Display`
/// implementation.
///
/// # Examples
///
/// ```
/// use unbox_core::Credential;
///
/// let credential = Credential::new("hunter2");
/// assert_eq!(format!("{credential:?}"), "Credential(<redacted>)");
/// assert_eq!(credential.expose(), "hunter2");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wraps a secret string.
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Returns the secret for handing to a collaborator.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the secret as raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl From<&str> for Credential {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

impl From<String> for Credential {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let credential = Credential::from("s3cret");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("s3cret"));

        let wrapped = Some(credential);
        assert!(!format!("{wrapped:?}").contains("s3cret"));
    }

    #[test]
    fn test_expose_and_bytes() {
        let credential = Credential::new(String::from("pässword"));
        assert_eq!(credential.expose(), "pässword");
        assert_eq!(credential.as_bytes(), "pässword".as_bytes());
    }
}
