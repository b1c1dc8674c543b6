// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for storehouse operations.

use std::fmt;

/// Classifies a storehouse [`Error`].
///
/// `NotFound` is the expected outcome of a miss and is used by the hybrid store to fall back from the
/// memory tier to the disk tier. The remaining kinds describe genuine failures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No live entry exists for the key.
    NotFound,
    /// Stored bytes decoded to a different shape than the requested value type.
    TypeNotMatch,
    /// A file exists for the key but its metadata header is unreadable or corrupt.
    MalformedFileAttributes,
    /// Stored bytes could not be decoded.
    DecodingFailed,
    /// A value could not be encoded. Nothing was written.
    EncodingFailed,
    /// An underlying file system operation failed.
    Io,
    /// The key cannot be mapped to a file name.
    InvalidKey,
    /// A configuration value violates its constraints.
    InvalidConfiguration,
    /// Any other failure, typically raised by custom tier implementations.
    #[default]
    Other,
}

impl ErrorKind {
    /// Returns a stable, lowercase name for the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::TypeNotMatch => "type_not_match",
            Self::MalformedFileAttributes => "malformed_file_attributes",
            Self::DecodingFailed => "decoding_failed",
            Self::EncodingFailed => "encoding_failed",
            Self::Io => "io",
            Self::InvalidKey => "invalid_key",
            Self::InvalidConfiguration => "invalid_configuration",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from a storehouse operation.
///
/// The [`kind`](Error::kind) tells callers how to react; the underlying cause, if any, is available via
/// [`std::error::Error::source()`].
///
/// # Examples
///
/// ```
/// use storehouse_tier::{Error, ErrorKind};
///
/// let error = Error::from_kind(ErrorKind::NotFound);
/// assert!(error.is_not_found());
///
/// let error = Error::from_cause(ErrorKind::DecodingFailed, "unexpected end of input");
/// assert_eq!(error.kind(), ErrorKind::DecodingFailed);
/// ```
#[ohno::error]
#[display("storehouse operation failed: {kind}")]
#[from(std::io::Error(kind: ErrorKind::Io))]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates an error of the given kind without a cause.
    ///
    /// This is the public API for creating storehouse errors from other crates.
    #[must_use]
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind)
    }

    /// Creates an error of the given kind wrapping `cause`.
    ///
    /// # Examples
    ///
    /// ```
    /// use storehouse_tier::{Error, ErrorKind};
    ///
    /// let error = Error::from_cause(ErrorKind::InvalidKey, "key too long");
    /// assert_eq!(error.kind(), ErrorKind::InvalidKey);
    /// ```
    pub fn from_cause(kind: ErrorKind, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(kind, cause)
    }

    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found() -> Self {
        Self::new(ErrorKind::NotFound)
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` for the expected miss outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
}

/// A specialized [`Result`] type for storehouse operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_contains_kind_and_cause() {
        let error = Error::caused_by(ErrorKind::MalformedFileAttributes, "bad magic");
        let display = error.to_string();
        assert!(display.contains("malformed_file_attributes"), "got: {display}");
        assert!(display.contains("bad magic"), "got: {display}");
    }

    #[test]
    fn public_constructors_keep_kind_and_cause() {
        let error = Error::from_cause(ErrorKind::InvalidKey, "key too long");
        assert_eq!(error.kind(), ErrorKind::InvalidKey);
        assert!(error.to_string().contains("key too long"));
        assert_eq!(Error::from_kind(ErrorKind::Other).kind(), ErrorKind::Other);
    }

    #[test]
    fn io_errors_convert_to_io_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let error = Error::from(io);
        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(!error.is_not_found());
    }

    #[test]
    fn not_found_helper() {
        let error = Error::not_found();
        assert!(error.is_not_found());
        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn result_alias_propagates() {
        fn fails() -> Result<()> {
            Err(Error::new(ErrorKind::EncodingFailed))
        }

        let err = fails().expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::EncodingFailed);
    }

    #[test]
    fn kind_names_are_unique() {
        let kinds = [
            ErrorKind::NotFound,
            ErrorKind::TypeNotMatch,
            ErrorKind::MalformedFileAttributes,
            ErrorKind::DecodingFailed,
            ErrorKind::EncodingFailed,
            ErrorKind::Io,
            ErrorKind::InvalidKey,
            ErrorKind::InvalidConfiguration,
            ErrorKind::Other,
        ];
        let names: std::collections::HashSet<_> = kinds.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), kinds.len());
    }
}
