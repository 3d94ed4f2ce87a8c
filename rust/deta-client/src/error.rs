use std::path::PathBuf;

use deta_credentials::CredentialError;
use thiserror::Error;

/// Errors surfaced by the client.
///
/// Nothing is retried or swallowed internally. Server side failures carry the
/// status code and response body so callers can decide whether to call again,
/// and a repeated call is always signed afresh.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The access token is malformed or missing. Detected before any network call.
    #[error(transparent)]
    InvalidCredential(#[from] CredentialError),

    /// The client configuration is unusable (e.g. a host is not a valid URL).
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    /// Connection, DNS, TLS or timeout failure in the HTTP transport.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The server refused the signature or the timestamp.
    #[error("request rejected by server (HTTP {status}): {body}")]
    AuthRejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The addressed resource does not exist.
    #[error("resource not found: {body}")]
    NotFound {
        /// Response body
        body: String,
    },

    /// The request conflicts with existing state (e.g. a duplicate name).
    #[error("conflict: {body}")]
    Conflict {
        /// Response body
        body: String,
    },

    /// Any other non-success status.
    #[error("request failed (HTTP {status}): {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// The operation is not supported by this client. No request was sent.
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    /// A program lacks the account or region needed to route to its shard.
    #[error("program {program} has no {field}; cannot address its shard")]
    MissingPlacement {
        /// Program id
        program: String,
        /// The absent field
        field: &'static str,
    },

    /// A caller supplied header would collide with a signing header.
    #[error("header {0} is set by the signer and cannot be supplied by the caller")]
    ReservedHeader(String),

    /// The request could not be assembled from the given arguments.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// JSON encoding or decoding failed.
    #[error("failed to serialize/deserialize data: {0}")]
    Serialization(String),

    /// Reading a local file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The file or directory being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// HTTP status of a server side failure, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthRejected { status, .. } | Self::Status { status, .. } => Some(*status),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            _ => None,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::Transport(error.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        ClientError::Serialization(error.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(error: url::ParseError) -> Self {
        ClientError::Configuration(error.to_string())
    }
}
