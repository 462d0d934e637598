//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Remote Service Errors
    // ─────────────────────────────────────────────────────────────
    #[error("{endpoint} request failed: {status} {reason}")]
    Http {
        endpoint: String,
        status: u16,
        reason: String,
    },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Malformed service response: {message}")]
    Protocol { message: String },

    #[error("Invalid service host: {url}")]
    InvalidHost { url: String },

    // ─────────────────────────────────────────────────────────────
    // Frame Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Frame error: {message}")]
    Frame { message: String },

    // ─────────────────────────────────────────────────────────────
    // AI Generation Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Code generation failed: {reason}")]
    Generation { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Source file not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("File watcher error: {message}")]
    Watcher { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn http(endpoint: impl Into<String>, status: u16, reason: impl Into<String>) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            status,
            reason: reason.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn invalid_host(url: impl Into<String>) -> Self {
        Self::InvalidHost { url: url.into() }
    }

    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }

    pub fn generation(reason: impl Into<String>) -> Self {
        Self::Generation {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn watcher(message: impl Into<String>) -> Self {
        Self::Watcher {
            message: message.into(),
        }
    }

    /// HTTP status of a failed service call, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Errors that leave nothing to run against
    ///
    /// Service and frame failures never are: the user can simply run again.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::InvalidHost { .. } | Error::SourceNotFound { .. } | Error::Config { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Log a failure where it happens and convert it into [`Error`]
pub trait ResultExt<T> {
    /// `what` names the operation that failed, e.g. `"writing frame script"`
    fn context(self, what: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the description only on failure
    fn with_context<F>(self, what: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, what: impl Into<String>) -> Result<T> {
        self.with_context(|| what.into())
    }

    fn with_context<F>(self, what: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::warn!("{} failed: {}", what(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = Error::http("compileNewDDC", 500, "Internal Server Error");
        assert_eq!(
            err.to_string(),
            "compileNewDDC request failed: 500 Internal Server Error"
        );
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_service_errors_are_not_fatal() {
        assert!(!Error::http("analyze", 503, "Service Unavailable").is_fatal());
        assert!(!Error::transport("connection refused").is_fatal());
        assert!(!Error::protocol("missing field").is_fatal());
        assert!(!Error::generation("quota exceeded").is_fatal());
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::invalid_host("not a url").is_fatal());
        assert!(Error::SourceNotFound {
            path: PathBuf::from("/missing/main.dart")
        }
        .is_fatal());
        assert!(Error::config("unknown channel").is_fatal());
        assert!(!Error::frame("detached").is_fatal());
    }

    #[test]
    fn test_context_preserves_error() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.context("writing frame script").unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        let ok: std::result::Result<u8, serde_json::Error> = serde_json::from_str("7");
        assert_eq!(ok.with_context(|| unreachable!()).unwrap(), 7);
    }
}
