//! Error types for the storage contract.
use std::error::Error as StdError;
use std::fmt;

/// Errors returned by every [`crate::Storage`] operation.
///
/// Errors are categorized by `error_kind`; `source` holds the backend error that caused it,
/// when there is one. Backend-native errors never cross the contract boundary as their own
/// type, they are always carried here behind a kind that names the failing operation.
#[derive(Debug)]
pub struct Error {
    // Underlying error emitted by the backend, if any
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    // Enum representing which category of error
    pub error_kind: StorageErrorKind,
}

/// The context strings carried by most variants name the operation and entity they occurred
/// in, e.g. `"insert auth_request"` or `"auth_request.scopes"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageErrorKind {
    // No row exists for the requested identifier
    NotFound,
    // A composite field could not be serialized
    Encode(String),
    // A stored composite field is malformed; not retryable
    Decode(String),
    // Constraint violation (duplicate identifier) or any other rejected write
    Write(String),
    // A read statement failed
    Query(String),
    // The backend could not be reached
    Connection(String),
    // Schema migration failed; the backend is unusable
    Migration(String),
    // Backend configuration is invalid
    Config(String),
    // A caller-supplied updater refused to produce a new value
    Rejected(String),
}

impl Error {
    pub fn new(error_kind: StorageErrorKind) -> Self {
        Error {
            source: None,
            error_kind,
        }
    }

    pub fn with_source(
        error_kind: StorageErrorKind,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Error {
            source: Some(source.into()),
            error_kind,
        }
    }

    /// The not-found condition. It never carries a source so that callers can compare kinds
    /// exactly.
    pub fn not_found() -> Self {
        Self::new(StorageErrorKind::NotFound)
    }

    /// Used by updaters to abort an update, e.g. "fail unless still logged out".
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::Rejected(reason.into()))
    }

    pub fn is_not_found(&self) -> bool {
        self.error_kind == StorageErrorKind::NotFound
    }

    /// Integrity faults are never worth retrying.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self.error_kind,
            StorageErrorKind::Encode(_) | StorageErrorKind::Decode(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            StorageErrorKind::NotFound => write!(f, "not found"),
            StorageErrorKind::Encode(ctx) => write!(f, "encode {ctx}"),
            StorageErrorKind::Decode(ctx) => write!(f, "decode {ctx}"),
            StorageErrorKind::Write(ctx)
            | StorageErrorKind::Query(ctx)
            | StorageErrorKind::Connection(ctx)
            | StorageErrorKind::Migration(ctx)
            | StorageErrorKind::Config(ctx) => write!(f, "{ctx}"),
            StorageErrorKind::Rejected(reason) => write!(f, "update rejected: {reason}"),
        }?;
        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_has_no_source() {
        let err = Error::not_found();
        assert!(err.is_not_found());
        assert!(err.source.is_none());
        assert_eq!(err.to_string(), "not found");
    }

    #[test]
    fn display_includes_context_and_source() {
        let source = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let err = Error::with_source(
            StorageErrorKind::Write("insert client".to_string()),
            source,
        );
        assert_eq!(err.to_string(), "insert client: disk on fire");
        assert!(StdError::source(&err).is_some());
        assert!(!err.is_not_found());
    }

    #[test]
    fn codec_errors_are_integrity_faults() {
        let err = Error::new(StorageErrorKind::Decode("client.redirect_uris".to_string()));
        assert!(err.is_integrity_fault());
        assert!(!Error::rejected("nope").is_integrity_fault());
    }

    #[test]
    fn rejected_formats_reason() {
        assert_eq!(
            Error::rejected("already logged in").to_string(),
            "update rejected: already logged in"
        );
    }
}
