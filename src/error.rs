use http::StatusCode;
use thiserror::Error;

/// Multipart framing and payload decode failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Generic decode failure with message context.
    #[error("{message}")]
    Message {
        /// Decode failure message.
        message: String,
    },
}

impl DecodeError {
    /// Creates a decode error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

/// Runtime error type used by `couchstream`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CouchError {
    /// A request was rejected locally before any network call.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Reason the argument was rejected.
        message: String,
    },
    /// Transport-level failure propagated from the HTTP collaborator.
    #[error("transport failure: {message}")]
    Transport {
        /// Transport failure message.
        message: String,
    },
    /// Server returned a non-2xx status with no special-case mapping.
    #[error("server returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code returned by the server.
        status: StatusCode,
        /// Error payload returned by the server.
        body: String,
    },
    /// Multipart framing failure.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Response body could not be decoded as JSON.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    /// Multipart stream ended before a complete terminal boundary.
    #[error("multipart stream ended unexpectedly")]
    IncompleteStream,
}

impl CouchError {
    /// Creates an invalid-argument error from a message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a transport error from a message.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}
