use std::fmt;

// === BookmarkError ===

/// Errors surfaced by the bookmark state engine.
///
/// `InvalidUrl`, `EmptyField` and `NotFound` are raised synchronously before
/// any store mutation; `OperationFailed` is returned only after the
/// rollback-by-reload has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookmarkError {
    /// The provided URL is not a valid http/https URL.
    InvalidUrl(String),
    /// A required field was empty.
    EmptyField(&'static str),
    /// Bookmark with the given ID was not found in the local snapshot.
    NotFound(String),
    /// The backend rejected the operation or was unreachable.
    OperationFailed {
        /// The attempted action, e.g. "add bookmark".
        action: &'static str,
        message: String,
    },
}

impl fmt::Display for BookmarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookmarkError::InvalidUrl(url) => write!(f, "Invalid URL: {}", url),
            BookmarkError::EmptyField(field) => write!(f, "Field must not be empty: {}", field),
            BookmarkError::NotFound(id) => write!(f, "Bookmark not found: {}", id),
            BookmarkError::OperationFailed { action, message } => {
                write!(f, "Failed to {}: {}", action, message)
            }
        }
    }
}

impl std::error::Error for BookmarkError {}

// === BackendError ===

/// Uniform transport/authorization failure reported by the persistence
/// service. The coordinator treats every backend failure the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError(pub String);

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Backend error: {}", self.0)
    }
}

impl std::error::Error for BackendError {}
