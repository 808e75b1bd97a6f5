//! Error types for cairn-core.

use cairn_config::error::ConfigError;
use cairn_dl::FetchError;
use cairn_registry::ValidationError;
use cairn_utils::error::{FileSystemError, PathError};
use miette::Diagnostic;
use thiserror::Error;

/// Core error type for cairn cache operations.
#[derive(Error, Diagnostic, Debug)]
pub enum CairnError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FileSystemError(#[from] FileSystemError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    PathError(#[from] PathError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error("Error while {action}")]
    #[diagnostic(code(cairn::io), help("Check file permissions and disk space"))]
    IoError {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    #[diagnostic(code(cairn::error))]
    Custom(String),
}

/// Trait for adding context to IO errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, CairnError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> std::result::Result<T, CairnError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            CairnError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_with_context() {
        let result: io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = result
            .with_context(|| "reading /cache".to_string())
            .unwrap_err();

        assert_eq!(err.to_string(), "Error while reading /cache");
        assert!(matches!(err, CairnError::IoError { .. }));
    }

    #[test]
    fn test_transparent_display() {
        let err = CairnError::from(FetchError::HttpStatus {
            status: 404,
            uri: "https://a/r.xml".to_string(),
        });
        assert_eq!(err.to_string(), "HTTP 404: https://a/r.xml");
    }
}
