//! Error types for apicheck
//!
//! Errors fall into two groups: test failures, which are recorded against a
//! single test and never stop the run, and everything else, which aborts the
//! run with the offending server or test name in the message.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for apicheck
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid test '{name}': {reason}")]
    InvalidTest { name: String, reason: String },

    #[error("Invalid configuration for server '{name}': {reason}")]
    InvalidServer { name: String, reason: String },

    #[error("Test '{test}' references unknown server '{server}'")]
    UnknownServer { test: String, server: String },

    // === Transport Errors ===
    #[error("Request for test '{test}' failed: {source}")]
    Transport {
        test: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Cannot connect to server '{server}': {source}")]
    ConnectFailed {
        server: String,
        #[source]
        source: Box<Error>,
    },

    // === Test Failures ===
    #[error("status code mismatched: wanted {expected}, got {actual}")]
    StatusMismatch { expected: u16, actual: u16 },

    #[error("response mismatched: {0}")]
    ContentMismatch(String),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("cannot extract JWT: {0}")]
    JwtExtraction(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid test error
    pub fn invalid_test(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidTest {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid server error
    pub fn invalid_server(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidServer {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a transport error for the named test
    pub fn transport(test: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            test: test.to_string(),
            source,
        }
    }

    /// Create a file read error
    pub fn file_read(path: &std::path::Path, error: &io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Whether this error is recorded against a single test rather than
    /// aborting the run
    pub fn is_test_failure(&self) -> bool {
        matches!(
            self,
            Error::StatusMismatch { .. }
                | Error::ContentMismatch(_)
                | Error::InvalidJson(_)
                | Error::JwtExtraction(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatches_are_test_failures() {
        assert!(Error::StatusMismatch {
            expected: 200,
            actual: 404
        }
        .is_test_failure());
        assert!(Error::ContentMismatch("$.id".to_string()).is_test_failure());
        assert!(Error::InvalidJson("eof".to_string()).is_test_failure());
        assert!(Error::JwtExtraction("missing".to_string()).is_test_failure());
    }

    #[test]
    fn test_config_errors_are_fatal() {
        assert!(!Error::Config("bad".to_string()).is_test_failure());
        assert!(!Error::invalid_test("a", "empty method").is_test_failure());
        assert!(!Error::Internal("x".to_string()).is_test_failure());
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = Error::UnknownServer {
            test: "getUser".to_string(),
            server: "api".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Test 'getUser' references unknown server 'api'"
        );

        let err = Error::ConnectFailed {
            server: "api".to_string(),
            source: Box::new(Error::StatusMismatch {
                expected: 200,
                actual: 401,
            }),
        };
        assert!(err.to_string().contains("'api'"));
        assert!(err.to_string().contains("wanted 200, got 401"));
    }
}
