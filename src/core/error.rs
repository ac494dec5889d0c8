//! Error types for the fairgrid library
//!
//! Distinguishes recoverable service vocabulary (handled inside the
//! pipeline) from run-level failures surfaced to the caller.

use std::fmt;

use crate::core::grid::GridCell;

/// Main error type for fairgrid operations
#[derive(Debug)]
pub enum Error {
    /// Invalid configuration or parameters
    InvalidInput(String),

    /// The directions service answered with a protocol-level failure
    /// (bad API key, malformed response, unexpected status)
    ApiError(String),

    /// Network connectivity issues (connect failures, timeouts)
    NetworkError(String),

    /// Other HTTP-level error
    HttpError(String),

    /// A lookup failed terminally while processing a cell; the traversal
    /// halts and reports which cell was in flight
    Lookup { cell: GridCell, message: String },

    /// The run was cancelled through its cancellation token
    Cancelled,

    /// File I/O error
    IoError(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {}", msg)
            }
            Error::ApiError(msg) => {
                write!(f, "Directions service error: {}", msg)
            }
            Error::NetworkError(msg) => {
                write!(f, "Network error: {}", msg)
            }
            Error::HttpError(msg) => {
                write!(f, "HTTP error: {}", msg)
            }
            Error::Lookup { cell, message } => {
                write!(f, "Lookup failed at cell ({}, {}): {}", cell.x, cell.y, message)
            }
            Error::Cancelled => {
                write!(f, "Survey cancelled")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {}", err)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Error::NetworkError(err.to_string())
        } else {
            Error::HttpError(err.to_string())
        }
    }
}

/// Convenience result type for fairgrid operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_names_cell() {
        let err = Error::Lookup {
            cell: GridCell { x: -3, y: 2 },
            message: "connection reset".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("(-3, 2)"), "message should name the cell: {text}");
        assert!(text.contains("connection reset"));
    }

    #[test]
    fn test_io_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from(io);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_cancelled_display() {
        assert_eq!(Error::Cancelled.to_string(), "Survey cancelled");
    }
}
