// ── Response envelope ──
//
// Every call made through the executor resolves to a `ResponseEnvelope`.
// The backend speaks `{ success, message?, data?, error?: { message, details? } }`;
// this module decodes that shape (plus bare JSON bodies and error bodies)
// into an enum that cannot hold both data and an error, or neither.

use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Fallback shown when neither the error nor the envelope carries a message.
pub const GENERIC_FAILURE_MESSAGE: &str = "خطا در انجام عملیات";

/// Longest slice of a response body kept in error details.
const BODY_PREVIEW_LEN: usize = 200;

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response reached the client (connect, DNS, reset).
    Network,
    /// The per-attempt timeout expired, or the server answered 408.
    Timeout,
    /// 4xx other than the auth and rate-limit statuses, or a 2xx body
    /// with `success: false`.
    Validation,
    /// No credential was available; nothing was sent.
    Unauthenticated,
    /// HTTP 401 reached the client.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// The refresh token was rejected; the session is gone.
    SessionExpired,
    /// HTTP 429 after retries were exhausted.
    RateLimited,
    /// HTTP 5xx after retries were exhausted.
    Server,
    /// Anything else: undecodable bodies, request build failures, panics.
    Unknown,
}

impl ErrorKind {
    /// Map a non-success HTTP status onto the taxonomy.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            408 => Self::Timeout,
            429 => Self::RateLimited,
            400..=499 => Self::Validation,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }

    /// Localized message used when the backend supplied none.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::Network => "خطا در ارتباط با سرور",
            Self::Timeout => "زمان درخواست به پایان رسید",
            Self::Validation => "اطلاعات وارد شده صحیح نیست",
            Self::Unauthenticated | Self::Unauthorized | Self::SessionExpired => {
                "لطفا وارد حساب کاربری خود شوید"
            }
            Self::Forbidden => "شما اجازه دسترسی به این بخش را ندارید",
            Self::RateLimited | Self::Server => "خطای سرور. لطفا بعدا تلاش کنید",
            Self::Unknown => GENERIC_FAILURE_MESSAGE,
        }
    }
}

/// The error half of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// HTTP status, when a response was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            status: None,
        }
    }

    /// An error carrying the default message for `kind`.
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    /// An error for a non-success HTTP status with no usable body.
    pub fn from_status(status: u16) -> Self {
        let kind = ErrorKind::from_status(status);
        let message = if status == 404 {
            "اطلاعات مورد نظر یافت نشد"
        } else {
            kind.default_message()
        };
        Self::new(kind, message).with_status(status)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// `true` when the server rejected the presented credential.
    pub fn is_auth_failure(&self) -> bool {
        self.kind == ErrorKind::Unauthorized || self.status == Some(401)
    }
}

/// Normalized outcome of one API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope<T> {
    Success {
        data: T,
        message: Option<String>,
    },
    Failure {
        error: ApiError,
        message: Option<String>,
    },
}

impl<T> ResponseEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self::Success {
            data,
            message: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Self::Failure {
            error,
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    /// The top-level `message` the backend attached, on either arm.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { message, .. } | Self::Failure { message, .. } => message.as_deref(),
        }
    }

    /// Human-readable failure text: `error.message`, then `message`, then
    /// the generic fallback. `None` on success.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, message } => Some(
                Some(error.message.as_str())
                    .filter(|m| !m.is_empty())
                    .or_else(|| message.as_deref().filter(|m| !m.is_empty()))
                    .unwrap_or(GENERIC_FAILURE_MESSAGE)
                    .to_owned(),
            ),
        }
    }

    pub fn into_result(self) -> Result<T, ApiError> {
        match self {
            Self::Success { data, .. } => Ok(data),
            Self::Failure { error, .. } => Err(error),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        match self {
            Self::Success { data, message } => ResponseEnvelope::Success {
                data: f(data),
                message,
            },
            Self::Failure { error, message } => ResponseEnvelope::Failure { error, message },
        }
    }

    pub(crate) fn with_message(self, message: Option<String>) -> Self {
        match self {
            Self::Success { data, .. } => Self::Success { data, message },
            Self::Failure { error, .. } => Self::Failure { error, message },
        }
    }
}

/// Serializes to the backend wire shape.
impl<T: Serialize> Serialize for ResponseEnvelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ResponseEnvelope", 3)?;
        state.serialize_field("success", &self.is_success())?;
        if let Some(message) = self.message() {
            state.serialize_field("message", message)?;
        } else {
            state.skip_field("message")?;
        }
        match self {
            Self::Success { data, .. } => state.serialize_field("data", data)?,
            Self::Failure { error, .. } => state.serialize_field("error", error)?,
        }
        state.end()
    }
}

// ── Decoding ─────────────────────────────────────────────────────────

/// The backend's envelope as it appears on the wire.
#[derive(Deserialize)]
struct WireEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

fn body_preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    text.chars().take(BODY_PREVIEW_LEN).collect()
}

fn parse_body(body: &[u8]) -> Result<Value, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        Ok(Value::Null)
    } else {
        serde_json::from_slice(body)
    }
}

fn looks_like_envelope(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|obj| obj.get("success"))
        .is_some_and(Value::is_boolean)
}

fn decode_data<T: DeserializeOwned>(data: Value, status: u16) -> ResponseEnvelope<T> {
    match serde_json::from_value::<T>(data) {
        Ok(data) => ResponseEnvelope::success(data),
        Err(e) => ResponseEnvelope::failure(
            ApiError::new(ErrorKind::Unknown, GENERIC_FAILURE_MESSAGE)
                .with_status(status)
                .with_details(Value::String(format!("unexpected response shape: {e}"))),
        ),
    }
}

/// Decode a 2xx response body.
///
/// Bodies shaped like the backend envelope are unwrapped; any other JSON
/// is treated as bare `data` (the token refresh endpoint answers that way).
/// An empty body decodes as `null`.
pub fn decode_success<T: DeserializeOwned>(status: u16, body: &[u8]) -> ResponseEnvelope<T> {
    let value = match parse_body(body) {
        Ok(value) => value,
        Err(e) => {
            return ResponseEnvelope::failure(
                ApiError::new(ErrorKind::Unknown, GENERIC_FAILURE_MESSAGE)
                    .with_status(status)
                    .with_details(serde_json::json!({
                        "reason": format!("invalid JSON: {e}"),
                        "body": body_preview(body),
                    })),
            );
        }
    };

    if !looks_like_envelope(&value) {
        return decode_data(value, status);
    }

    match serde_json::from_value::<WireEnvelope>(value) {
        Ok(wire) if wire.success => {
            decode_data(wire.data.unwrap_or(Value::Null), status).with_message(wire.message)
        }
        Ok(wire) => {
            let (message, details) = wire
                .error
                .map(|e| (e.message, e.details))
                .unwrap_or_default();
            let message = message
                .or_else(|| wire.message.clone())
                .unwrap_or_else(|| ErrorKind::Validation.default_message().to_owned());
            let mut error = ApiError::new(ErrorKind::Validation, message).with_status(status);
            error.details = details;
            ResponseEnvelope::Failure {
                error,
                message: wire.message,
            }
        }
        Err(e) => ResponseEnvelope::failure(
            ApiError::new(ErrorKind::Unknown, GENERIC_FAILURE_MESSAGE)
                .with_status(status)
                .with_details(Value::String(format!("malformed envelope: {e}"))),
        ),
    }
}

/// Decode a non-success response into an error envelope.
///
/// Looks for `error.message`, then a top-level `message`, then DRF's
/// `detail`; falls back to the default message for the status.
pub fn decode_failure<T>(status: u16, body: &[u8]) -> ResponseEnvelope<T> {
    let mut error = ApiError::from_status(status);
    let mut top_message = None;

    match parse_body(body) {
        Ok(Value::Object(obj)) => {
            let nested = obj.get("error").and_then(Value::as_object);
            top_message = obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_owned);

            let message = nested
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .or(top_message.as_deref())
                .or_else(|| obj.get("detail").and_then(Value::as_str));
            if let Some(message) = message.filter(|m| !m.is_empty()) {
                message.clone_into(&mut error.message);
            }

            error.details = match nested.and_then(|e| e.get("details")) {
                Some(details) => Some(details.clone()),
                None if nested.is_none() => Some(Value::Object(obj.clone())),
                None => None,
            };
        }
        Ok(Value::Null) => {}
        Ok(other) => error.details = Some(other),
        Err(_) => error.details = Some(Value::String(body_preview(body))),
    }

    ResponseEnvelope::Failure {
        error,
        message: top_message,
    }
}
