use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FirestoreErrorCode {
    InvalidArgument,
    Internal,
    NotFound,
    PermissionDenied,
    Unavailable,
    ResourceExhausted,
    /// A writer node combines a fixed child id, a list payload and nested writers.
    InvalidWriterConfig,
    /// An ordering operation touched an element that was never read from the store.
    NotPersisted,
    /// A deep read with [`NotFoundPolicy::Throw`](crate::extended::NotFoundPolicy::Throw)
    /// hit a missing document.
    DocNotFound,
}

impl FirestoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirestoreErrorCode::InvalidArgument => "firestore/invalid-argument",
            FirestoreErrorCode::Internal => "firestore/internal",
            FirestoreErrorCode::NotFound => "firestore/not-found",
            FirestoreErrorCode::PermissionDenied => "firestore/permission-denied",
            FirestoreErrorCode::Unavailable => "firestore/unavailable",
            FirestoreErrorCode::ResourceExhausted => "firestore/resource-exhausted",
            FirestoreErrorCode::InvalidWriterConfig => {
                "firestore-ext/invalid-sub-collection-writers"
            }
            FirestoreErrorCode::NotPersisted => {
                "firestore-ext/unable-to-change-index-of-non-document"
            }
            FirestoreErrorCode::DocNotFound => "firestore-ext/doc-not-found",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FirestoreError {
    pub code: FirestoreErrorCode,
    message: String,
}

impl FirestoreError {
    pub fn new(code: FirestoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for FirestoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for FirestoreError {}

pub type FirestoreResult<T> = Result<T, FirestoreError>;

pub fn invalid_argument(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::InvalidArgument, message)
}

pub fn internal_error(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Internal, message)
}

pub fn not_found(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::NotFound, message)
}

pub fn permission_denied(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::PermissionDenied, message)
}

pub fn unavailable(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::Unavailable, message)
}

pub fn resource_exhausted(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::ResourceExhausted, message)
}

pub fn invalid_writer_config(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::InvalidWriterConfig, message)
}

pub fn not_persisted(message: impl Into<String>) -> FirestoreError {
    FirestoreError::new(FirestoreErrorCode::NotPersisted, message)
}

pub fn doc_not_found(path: &str) -> FirestoreError {
    FirestoreError::new(
        FirestoreErrorCode::DocNotFound,
        format!("Document not found at {path}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code() {
        let err = doc_not_found("restaurants/r1");
        assert_eq!(
            err.to_string(),
            "Document not found at restaurants/r1 (firestore-ext/doc-not-found)"
        );
    }

    #[test]
    fn engine_codes_are_namespaced() {
        assert_eq!(
            invalid_writer_config("x").code_str(),
            "firestore-ext/invalid-sub-collection-writers"
        );
        assert_eq!(
            not_persisted("x").code,
            FirestoreErrorCode::NotPersisted
        );
    }
}
