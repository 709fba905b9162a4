//! Error types for the catalogue

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for catalogue operations
#[derive(Error, Debug)]
pub enum CatalogueError {
    /// Caller input is missing or invalid
    #[error("{0}")]
    InvalidInput(String),

    /// Referenced entity does not exist
    #[error("{entity} not found")]
    NotFound {
        /// Kind of entity that was looked up (e.g. "Book")
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Reading or writing a collection file failed
    #[error("IO error on {path:?}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A collection document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A collection document has the wrong shape
    #[error("Malformed collection file {path:?}: {reason}")]
    MalformedCollection {
        /// File being decoded
        path: PathBuf,
        /// What was wrong with it
        reason: String,
    },
}

impl CatalogueError {
    /// Shorthand for an invalid-input error
    pub fn invalid(msg: impl Into<String>) -> Self {
        CatalogueError::InvalidInput(msg.into())
    }

    /// Shorthand for a missing book
    pub fn book_not_found(id: impl Into<String>) -> Self {
        CatalogueError::NotFound {
            entity: "Book",
            id: id.into(),
        }
    }

    /// Whether the error was caused by storage rather than by the caller
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            CatalogueError::Io { .. }
                | CatalogueError::Serialization(_)
                | CatalogueError::MalformedCollection { .. }
        )
    }
}

/// Result type alias for catalogue operations
pub type Result<T> = std::result::Result<T, CatalogueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = CatalogueError::book_not_found("42");
        assert_eq!(err.to_string(), "Book not found");
        assert!(!err.is_storage());
    }

    #[test]
    fn test_io_error_is_storage() {
        let err = CatalogueError::Io {
            path: PathBuf::from("data/books.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.is_storage());
        assert!(err.to_string().contains("books.json"));
    }

    #[test]
    fn test_invalid_input_message_is_verbatim() {
        let err = CatalogueError::invalid("Rating must be between 1 and 5");
        assert_eq!(err.to_string(), "Rating must be between 1 and 5");
    }
}
