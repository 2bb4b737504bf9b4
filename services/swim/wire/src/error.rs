//! Wire protocol error types.

use thiserror::Error;

/// Category of a decode or encode failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Value carries the wrong MessagePack type marker
    TypeMismatch,
    /// Declared size exceeds the remaining bytes
    Truncated,
    /// Enum or numeric value outside its valid range
    OutOfRange,
    /// Wrong key count or unexpected key for a section
    Structure,
    /// Mandatory field never set
    Missing,
}

/// SWIM codec error.
///
/// Every failure carries one human-readable message built from the caller's
/// context prefix and the field label, e.g.
/// `"invalid meta section: source port is an invalid port"`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SwimError {
    kind: ErrorKind,
    message: String,
}

impl SwimError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn type_mismatch(prefix: &str, field: &str, expected: &str) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("{} {} should be {}", prefix, field, expected),
        )
    }

    pub(crate) fn truncated(prefix: &str, field: &str, expected: &str) -> Self {
        Self::new(
            ErrorKind::Truncated,
            format!("{} {} should be {}", prefix, field, expected),
        )
    }

    pub(crate) fn out_of_range(prefix: &str, what: &str) -> Self {
        Self::new(ErrorKind::OutOfRange, format!("{} {}", prefix, what))
    }

    pub(crate) fn structure(prefix: &str, what: &str) -> Self {
        Self::new(ErrorKind::Structure, format!("{} {}", prefix, what))
    }

    pub(crate) fn missing(prefix: &str, what: &str) -> Self {
        Self::new(ErrorKind::Missing, format!("{} {}", prefix, what))
    }

    /// Failure category
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Full diagnostic message
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message() {
        let err = SwimError::type_mismatch("invalid meta section:", "root", "a map");
        assert_eq!(err.to_string(), "invalid meta section: root should be a map");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_same_text_different_kind() {
        let a = SwimError::type_mismatch("p", "member", "a map");
        let b = SwimError::truncated("p", "member", "a map");
        assert_eq!(a.message(), b.message());
        assert_ne!(a.kind(), b.kind());
    }
}
