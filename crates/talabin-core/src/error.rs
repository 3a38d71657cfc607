// ── Core error types ──
//
// Failures of the client-side machinery itself: session persistence and
// executor construction. Call outcomes stay in `ResponseEnvelope`; the
// `From<ApiError>` impl exists for consumers that want `?` on an envelope.

use std::path::PathBuf;

use talabin_api::{ApiError, ErrorKind};
use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage errors ───────────────────────────────────────────────
    #[error("Cannot access session file {path}: {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session file {path} is not valid JSON: {reason}")]
    CorruptStorage { path: PathBuf, reason: String },

    #[error("Cannot encode session value '{key}': {reason}")]
    Encode { key: String, reason: String },

    // ── Call errors (from envelopes) ─────────────────────────────────
    #[error("{message}")]
    Api {
        kind: ErrorKind,
        message: String,
        /// HTTP status code (if a response was received).
        status: Option<u16>,
    },

    // ── Construction errors ──────────────────────────────────────────
    #[error(transparent)]
    Client(#[from] talabin_api::Error),
}

impl CoreError {
    /// The call-error kind, if this came from an envelope.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<ApiError> for CoreError {
    fn from(err: ApiError) -> Self {
        Self::Api {
            kind: err.kind,
            message: err.message,
            status: err.status,
        }
    }
}
