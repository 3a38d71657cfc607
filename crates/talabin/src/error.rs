//! CLI error types with miette diagnostics.
//!
//! Maps failure envelopes and library errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use talabin_api::{ApiError, ErrorKind};
use talabin_config::ConfigError;
use talabin_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the Talabin backend: {message}")]
    #[diagnostic(
        code(talabin::connection_failed),
        help(
            "Check that the backend is running and the base URL is right.\n\
             Current base URL: {url}"
        )
    )]
    ConnectionFailed { url: String, message: String },

    #[error("Request timed out: {message}")]
    #[diagnostic(
        code(talabin::timeout),
        help("Increase the timeout with --timeout-ms or timeout_ms in config.toml.")
    )]
    Timeout { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Not signed in")]
    #[diagnostic(
        code(talabin::not_signed_in),
        help("Run: talabin login --phone <PHONE>")
    )]
    NotSignedIn,

    #[error("{message}")]
    #[diagnostic(
        code(talabin::auth_failed),
        help("Your session ended. Run: talabin login --phone <PHONE>")
    )]
    AuthFailed { message: String },

    #[error("{message}")]
    #[diagnostic(code(talabin::forbidden))]
    Forbidden { message: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(talabin::not_found))]
    NotFound { message: String },

    #[error("{message}")]
    #[diagnostic(code(talabin::rejected), help("{details}"))]
    Rejected { message: String, details: String },

    #[error("{message}")]
    #[diagnostic(code(talabin::server_error))]
    Server { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(talabin::validation))]
    Validation { field: String, reason: String },

    // ── Configuration / local state ──────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(talabin::config),
        help("Check config.toml and TALABIN_* environment variables. Run: talabin config path")
    )]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(talabin::session))]
    Session(#[from] CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(talabin::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotSignedIn | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Session(err) => match err.kind() {
                Some(ErrorKind::Network) => exit_code::CONNECTION,
                Some(ErrorKind::Timeout) => exit_code::TIMEOUT,
                Some(kind) if is_auth_kind(kind) => exit_code::AUTH,
                _ => exit_code::GENERAL,
            },
            Self::Rejected { .. }
            | Self::Server { .. }
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_) => exit_code::GENERAL,
        }
    }

    /// Build from a failure envelope's error, with the base URL for
    /// connection hints.
    pub fn from_api(error: ApiError, base_url: &str) -> Self {
        let message = error.message;
        match error.kind {
            ErrorKind::Network => Self::ConnectionFailed {
                url: base_url.to_owned(),
                message,
            },
            ErrorKind::Timeout => Self::Timeout { message },
            kind if is_auth_kind(kind) => Self::AuthFailed { message },
            ErrorKind::Forbidden => Self::Forbidden { message },
            ErrorKind::Validation if error.status == Some(404) => Self::NotFound { message },
            ErrorKind::Validation => Self::Rejected {
                message,
                details: error
                    .details
                    .map(|d| render_details(&d))
                    .unwrap_or_default(),
            },
            _ => Self::Server { message },
        }
    }
}

fn is_auth_kind(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Unauthenticated | ErrorKind::Unauthorized | ErrorKind::SessionExpired
    )
}

/// Field errors as `field: message` lines.
fn render_details(details: &serde_json::Value) -> String {
    match details {
        serde_json::Value::Object(fields) => fields
            .iter()
            .map(|(field, value)| format!("{field}: {}", flatten_messages(value)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => flatten_messages(other),
    }
}

fn flatten_messages(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(flatten_messages)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
