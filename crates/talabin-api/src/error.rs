use thiserror::Error;

/// Construction-time error type for the `talabin-api` crate.
///
/// Request outcomes never surface as this type -- they are always folded
/// into a [`ResponseEnvelope`](crate::ResponseEnvelope). These variants
/// cover what can go wrong *before* any request is sent: a bad base URL,
/// an unusable header, malformed user input, or an HTTP client that
/// refuses to build.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL parsed but is not usable (wrong scheme, cannot be a base).
    #[error("Unsupported base URL '{url}': {reason}")]
    UnsupportedBaseUrl { url: String, reason: String },

    /// A configured header name or value is not valid HTTP.
    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// A configuration field failed validation.
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // ── Input ───────────────────────────────────────────────────────
    /// A phone number or national ID failed format validation.
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    // ── Transport ───────────────────────────────────────────────────
    /// TLS setup or HTTP client construction error.
    #[error("TLS error: {0}")]
    Tls(String),
}
