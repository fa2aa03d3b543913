//! Error types for promptmerge modules using thiserror.

use std::fmt;

use thiserror::Error;

/// Why an API key was rejected before any request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFault {
    /// No key was supplied (or it was only whitespace).
    Missing,
    /// The key does not carry the provider's `sk-` prefix.
    BadPrefix,
}

impl fmt::Display for CredentialFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialFault::Missing => f.write_str("no API key supplied"),
            CredentialFault::BadPrefix => f.write_str("API key must start with sk-"),
        }
    }
}

/// Network-layer fault category carried by [`MergeError::TransportFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Connection could not be established (DNS, refused, TLS handshake).
    Connect,
    /// The request failed after the connection was made.
    Request,
    /// The response body could not be read.
    Body,
    /// The HTTP client itself could not be constructed.
    Client,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Connect => "connect",
            TransportKind::Request => "request",
            TransportKind::Body => "body",
            TransportKind::Client => "client",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a single HTTP attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to read response body: {0}")]
    Body(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

impl TransportError {
    /// Whether the transport should resend the request after this fault.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::Connect(_))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else if err.is_builder() {
            TransportError::Build(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Errors from a prompt merge call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("Invalid API key: {0}")]
    InvalidCredential(CredentialFault),

    #[error("At least one non-empty prompt fragment is required")]
    NoInput,

    #[error("API returned HTTP {status}: {detail}")]
    ApiError { status: u16, detail: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Network failure ({kind}): {detail}")]
    TransportFailure { kind: TransportKind, detail: String },

    #[error("API returned non-JSON content (HTTP {status})")]
    MalformedResponse { status: u16 },

    #[error("API returned empty content")]
    EmptyResponse,
}

impl MergeError {
    /// HTTP status associated with the failure, `None` for non-HTTP faults.
    pub fn status(&self) -> Option<u16> {
        match self {
            MergeError::ApiError { status, .. } | MergeError::MalformedResponse { status } => {
                Some(*status)
            }
            MergeError::EmptyResponse => Some(200),
            _ => None,
        }
    }

    /// Whether the failure happened before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MergeError::InvalidCredential(_) | MergeError::NoInput
        )
    }
}

impl From<TransportError> for MergeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => MergeError::Timeout,
            TransportError::Connect(detail) => MergeError::TransportFailure {
                kind: TransportKind::Connect,
                detail,
            },
            TransportError::Request(detail) => MergeError::TransportFailure {
                kind: TransportKind::Request,
                detail,
            },
            TransportError::Body(detail) => MergeError::TransportFailure {
                kind: TransportKind::Body,
                detail,
            },
            TransportError::Build(detail) => MergeError::TransportFailure {
                kind: TransportKind::Client,
                detail,
            },
        }
    }
}
