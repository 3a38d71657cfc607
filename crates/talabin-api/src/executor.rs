// ── Request executor ──
//
// Sends `ApiRequest`s over one shared `reqwest::Client`, enforcing the
// per-attempt timeout and the retry policy, and folds every outcome into a
// `ResponseEnvelope`. Nothing here knows about credentials; the auth layer
// wraps this type and adds the `Authorization` header itself.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, trace, warn};

use crate::config::ClientConfig;
use crate::envelope::{ApiError, ErrorKind, ResponseEnvelope, decode_failure, decode_success};
use crate::error::Error;
use crate::request::ApiRequest;
use crate::transport::{build_client, header_map, merge_headers};

/// What a single attempt produced, before classification.
enum Attempt {
    Response { status: u16, body: Vec<u8> },
    Network(String),
    TimedOut,
    /// The request could not be built; nothing was sent.
    Unsendable(String),
}

/// Executes API calls under a fixed [`ClientConfig`].
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    default_headers: HeaderMap,
}

impl RequestExecutor {
    /// Validate `config` and build the HTTP client for it.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        let http = build_client(&config)?;
        Self::with_client(http, config)
    }

    /// Use a pre-built `reqwest::Client` (TLS settings in `config` are
    /// ignored).
    pub fn with_client(http: reqwest::Client, config: ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        let default_headers = header_map(&config.default_headers)?;
        Ok(Self {
            http,
            config: Arc::new(config),
            default_headers,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Run `request` with retries and return the normalized outcome.
    ///
    /// Never fails: transport errors, timeouts, HTTP errors and
    /// undecodable bodies all come back as `ResponseEnvelope::Failure`.
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> ResponseEnvelope<T> {
        self.run(request, self.config.retry.max_attempts()).await
    }

    /// Run `request` exactly once, ignoring the retry policy.
    pub async fn execute_once<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> ResponseEnvelope<T> {
        self.run(request, 1).await
    }

    async fn run<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        max_attempts: u32,
    ) -> ResponseEnvelope<T> {
        let prepared = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(error) => return ResponseEnvelope::failure(error),
        };
        let retry = &self.config.retry;

        let mut attempt = 1;
        loop {
            let retries_left = attempt < max_attempts;
            match self.attempt(request, &prepared).await {
                Attempt::Response { status, body } if (200..300).contains(&status) => {
                    trace!(status, bytes = body.len(), "response received");
                    return decode_success(status, &body);
                }
                Attempt::Response { status, body } => {
                    if retries_left && retry.is_retryable_status(status) {
                        debug!(
                            status,
                            attempt,
                            max_attempts,
                            "retryable status from {} {}",
                            request.method,
                            request.path
                        );
                    } else {
                        return decode_failure(status, &body);
                    }
                }
                Attempt::Network(reason) => {
                    if retries_left && retry.enabled {
                        debug!(attempt, max_attempts, "network error, will retry: {reason}");
                    } else {
                        warn!("{} {} failed: {reason}", request.method, request.path);
                        return ResponseEnvelope::failure(
                            ApiError::from_kind(ErrorKind::Network)
                                .with_details(json!({ "reason": reason })),
                        );
                    }
                }
                Attempt::Unsendable(reason) => {
                    warn!("{} {} not sent: {reason}", request.method, request.path);
                    return ResponseEnvelope::failure(
                        ApiError::from_kind(ErrorKind::Unknown)
                            .with_details(json!({ "reason": reason })),
                    );
                }
                Attempt::TimedOut => {
                    warn!(
                        timeout_ms = u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
                        "{} {} timed out",
                        request.method,
                        request.path
                    );
                    return ResponseEnvelope::failure(ApiError::from_kind(ErrorKind::Timeout));
                }
            }

            tokio::time::sleep(retry.retry_delay).await;
            attempt += 1;
        }
    }

    /// Resolve the URL and headers once; they do not change between attempts.
    fn prepare(&self, request: &ApiRequest) -> Result<Prepared, ApiError> {
        if let Some(reason) = request.body_error() {
            return Err(ApiError::from_kind(ErrorKind::Unknown)
                .with_details(json!({ "reason": format!("request body: {reason}") })));
        }
        let url = self.config.endpoint_url(&request.path).map_err(|e| {
            ApiError::from_kind(ErrorKind::Unknown)
                .with_details(json!({ "reason": format!("invalid endpoint '{}': {e}", request.path) }))
        })?;
        let overrides = header_map(&request.headers).map_err(|e| {
            ApiError::from_kind(ErrorKind::Unknown).with_details(json!({ "reason": e.to_string() }))
        })?;
        Ok(Prepared {
            url,
            headers: merge_headers(&self.default_headers, &overrides),
        })
    }

    async fn attempt(&self, request: &ApiRequest, prepared: &Prepared) -> Attempt {
        debug!("{} {}", request.method, prepared.url);

        let mut headers = prepared.headers.clone();
        if request.upload.is_some() {
            // reqwest sets the multipart content type with its boundary.
            headers.remove(CONTENT_TYPE);
        }
        let mut builder = self
            .http
            .request(request.method.clone(), prepared.url.clone())
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(upload) = &request.upload {
            match upload.to_form() {
                Ok(form) => builder = builder.multipart(form),
                Err(e) => return Attempt::Unsendable(format!("upload {}: {e}", upload.file_name)),
            }
        } else if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let exchange = async {
            let resp = builder.send().await?;
            let status = resp.status().as_u16();
            let body = resp.bytes().await?;
            Ok::<_, reqwest::Error>((status, body.to_vec()))
        };

        match tokio::time::timeout(self.config.timeout, exchange).await {
            Ok(Ok((status, body))) => Attempt::Response { status, body },
            Ok(Err(e)) => Attempt::Network(e.to_string()),
            Err(_) => Attempt::TimedOut,
        }
    }
}

struct Prepared {
    url: url::Url,
    headers: HeaderMap,
}
