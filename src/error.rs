//! Error types for the notebook client
//!
//! The core only distinguishes one failure class on the wire: anything that
//! goes wrong talking to the backend is an [`ApiError`], and every variant of
//! it is treated as a transport failure by the orchestrator. Backend error
//! payloads are carried verbatim, never parsed into finer kinds.

use std::path::PathBuf;

/// Failure of a single backend request
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured base URL cannot address the REST endpoints
    #[error("invalid backend URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Connection refused, DNS failure, timeout, client construction, ...
    #[error("{operation}: request failed: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status
    #[error("{operation}: backend returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },

    /// The backend answered 2xx but the body is not what the contract promises
    #[error("{operation}: could not decode response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ApiError {
    /// Name of the API operation that failed
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::InvalidBaseUrl { .. } => "build_client",
            Self::Transport { operation, .. }
            | Self::Status { operation, .. }
            | Self::Decode { operation, .. } => *operation,
        }
    }

    /// HTTP status, if the backend answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Document model errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("unknown cell type: {0} (expected code, markdown or raw)")]
    UnknownCellType(String),
}

/// Failure of one orchestrated user action
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The action needs a notebook in the store and there is none
    #[error("no notebook is loaded")]
    NoNotebook,

    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Transport failure: the protocol was aborted and the store left as it was
    #[error("backend request failed: {0}")]
    Api(#[from] ApiError),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    /// The underlying backend failure, if this is one
    #[must_use]
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            _ => None,
        }
    }
}
