//! Custom error types for certscope
//!
//! Every failure of a certificate fetch is folded into one [`FetchError`]
//! carrying a human readable message and an [`ErrorKind`] classification,
//! so callers never see raw transport errors.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Classification of a fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Missing or empty hostname, detected before any network activity
    InvalidInput,
    /// The handshake did not complete within the configured window
    Timeout,
    /// DNS failure, refused connection, TLS negotiation failure, ...
    ConnectionError,
    /// The handshake succeeded but the peer presented no certificate
    NoCertificate,
    /// The raw certificate could not be turned into a normalized record
    NormalizationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::ConnectionError => "ConnectionError",
            ErrorKind::NoCertificate => "NoCertificate",
            ErrorKind::NormalizationError => "NormalizationError",
        }
    }

    /// Process exit code used by the command-line front-end
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::InvalidInput => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Certificate fetch errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Connection timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("No certificate provided by server")]
    NoCertificate,

    #[error("Failed to normalize certificate: {message}")]
    Normalization { message: String },
}

impl FetchError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        FetchError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        FetchError::Connection {
            message: message.into(),
        }
    }

    pub fn normalization(message: impl Into<String>) -> Self {
        FetchError::Normalization {
            message: message.into(),
        }
    }

    /// Classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidInput { .. } => ErrorKind::InvalidInput,
            FetchError::Timeout { .. } => ErrorKind::Timeout,
            FetchError::Connection { .. } => ErrorKind::ConnectionError,
            FetchError::NoCertificate => ErrorKind::NoCertificate,
            FetchError::Normalization { .. } => ErrorKind::NormalizationError,
        }
    }

    /// Structured body surfaced to callers of the HTTP service
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            message: self.to_string(),
            kind: self.kind(),
        }
    }
}

/// Serializable `{ message, kind }` error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub kind: ErrorKind,
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            FetchError::invalid_input("x").kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            FetchError::Timeout { timeout_ms: 10 }.kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            FetchError::connection("refused").kind(),
            ErrorKind::ConnectionError
        );
        assert_eq!(FetchError::NoCertificate.kind(), ErrorKind::NoCertificate);
        assert_eq!(
            FetchError::normalization("bad date").kind(),
            ErrorKind::NormalizationError
        );
    }

    #[test]
    fn test_no_certificate_message() {
        assert_eq!(
            FetchError::NoCertificate.to_string(),
            "No certificate provided by server"
        );
    }

    #[test]
    fn test_error_response_json() {
        let body = serde_json::to_value(FetchError::Timeout { timeout_ms: 250 }.to_response())
            .unwrap();
        assert_eq!(body["kind"], "Timeout");
        assert_eq!(body["message"], "Connection timed out after 250 ms");
    }
}
