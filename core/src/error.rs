//! Error types for the fitness API client.
//!
//! # Design
//! `ErrorKind` is the failure taxonomy. Transport failures, error statuses,
//! and codec failures stay distinct because callers handle them differently:
//! a 409 on an idempotent create is survivable, a connect timeout is not.
//! `Error` pairs a kind with the operation that produced it, so a failure
//! renders as "failed to create data source" with the cause reachable
//! through `source()`. Nothing in here retries.

/// Underlying cause of a failed operation.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// The connection could not be established, timed out, or broke mid-read.
    #[error("transport failure: {0}")]
    Transport(#[from] ureq::Error),

    /// The server answered with a status >= 400. The body is kept verbatim.
    #[error("HTTP {status}: {body}")]
    Request { status: u16, body: String },

    /// A 2xx response carried a body that did not decode into the expected
    /// shape.
    #[error("could not decode response body")]
    Decode(#[source] serde_json::Error),

    /// The request payload could not be serialized to JSON.
    #[error("could not encode request body")]
    Encode(#[source] serde_json::Error),
}

/// A failed client operation: which operation, and why.
#[derive(Debug, thiserror::Error)]
#[error("{operation}")]
pub struct Error {
    operation: &'static str,
    #[source]
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new(operation: &'static str, kind: ErrorKind) -> Self {
        Self { operation, kind }
    }

    /// The operation-identifying message, e.g. `"failed to create data source"`.
    pub fn operation(&self) -> &str {
        self.operation
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> ErrorKind {
        self.kind
    }

    /// The HTTP status code, when the server answered with an error status.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::Request { status, .. } => Some(status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
