//! Error types for the ePub library.
//!
//! Lookups that only consult the in-memory tables fail with
//! [`LibraryError::NotFound`]. Operations that open containers or touch the
//! persisted library file surface [`LibraryError::LoadFailure`] and
//! [`LibraryError::Persistence`] to the caller; nothing here retries.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error produced by container, package and opener implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the ePub library.
#[derive(Debug, Error)]
pub enum LibraryError {
    // Lookup errors
    #[error("Publication not registered: {identifier}")]
    NotFound { identifier: String },

    #[error("Invalid ePub URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid locator: {message}")]
    InvalidLocator { message: String },

    #[error("Invalid publication identifier: {message}")]
    InvalidIdentifier { message: String },

    #[error("No manifest item at {fragment:?} in publication {identifier}")]
    FragmentNotFound {
        identifier: String,
        fragment: String,
    },

    // Loading errors
    #[error("Failed to load container at {locator}: {message}")]
    LoadFailure {
        locator: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Container at {locator} no longer contains publication {identifier}")]
    ConsistencyViolation { identifier: String, locator: String },

    // Persistence errors
    #[error("Persistence error at {path:?}: {message}")]
    Persistence {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Malformed library record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, LibraryError>;

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Persistence {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl LibraryError {
    /// Create a persistence error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LibraryError::Persistence {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Wrap a collaborator failure raised while loading from `locator`.
    pub fn load_failure(locator: impl ToString, source: BoxError) -> Self {
        LibraryError::LoadFailure {
            locator: locator.to_string(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Whether the error means "this identifier or fragment is unknown".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LibraryError::NotFound { .. } | LibraryError::FragmentNotFound { .. }
        )
    }

    /// Whether the error came from opening or parsing a container.
    ///
    /// Callers may retry these with a different locator.
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            LibraryError::LoadFailure { .. } | LibraryError::ConsistencyViolation { .. }
        )
    }
}
