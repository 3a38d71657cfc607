// ── Runtime client configuration ──
//
// The immutable settings every request is executed under. Built once at
// process start (usually by `talabin-config`) and shared behind an `Arc`.
// Nothing in here touches disk.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use url::Url;

use crate::error::Error;
use crate::transport::TlsMode;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];
pub const DEFAULT_USER_AGENT: &str = concat!("talabin/", env!("CARGO_PKG_VERSION"));

/// Retry behaviour of the request executor.
///
/// The pause between attempts is flat: attempt `n + 1` starts
/// `retry_delay` after attempt `n` settled, with no growth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub retryable_status_codes: BTreeSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Total number of attempts a single call may make.
    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.enabled && self.retryable_status_codes.contains(&status)
    }
}

/// Process-wide client settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend root, e.g. `http://localhost:8000/api`. Endpoint paths are
    /// appended verbatim.
    pub base_url: Url,
    /// Hard per-attempt timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Headers sent with every request. Call-specific headers override
    /// entries with the same (case-insensitive) name.
    pub default_headers: BTreeMap<String, String>,
    pub user_agent: String,
    pub tls: TlsMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            default_headers: default_headers(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            tls: TlsMode::System,
        }
    }
}

fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Content-Type".to_owned(), "application/json".to_owned()),
        ("Accept".to_owned(), "application/json".to_owned()),
    ])
}

impl ClientConfig {
    /// Default settings pointed at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let config = Self {
            base_url: Url::parse(base_url)?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    /// Check the invariants the executor relies on.
    pub fn validate(&self) -> Result<(), Error> {
        match self.base_url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::UnsupportedBaseUrl {
                    url: self.base_url.to_string(),
                    reason: format!("scheme '{other}' is not http or https"),
                });
            }
        }
        if self.base_url.cannot_be_a_base() {
            return Err(Error::UnsupportedBaseUrl {
                url: self.base_url.to_string(),
                reason: "URL cannot be used as a base".into(),
            });
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig {
                field: "timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if let Some(code) = self
            .retry
            .retryable_status_codes
            .iter()
            .find(|code| !(100..=599).contains(*code))
        {
            return Err(Error::InvalidConfig {
                field: "retry.retryable_status_codes".into(),
                reason: format!("{code} is not an HTTP status code"),
            });
        }
        Ok(())
    }

    /// Join an endpoint path onto the base URL.
    ///
    /// `http://host/api` + `/wallet/balance/` → `http://host/api/wallet/balance/`
    pub fn endpoint_url(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_surface() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/api");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.retry.enabled);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.retry_delay, Duration::from_secs(1));
        assert_eq!(
            config.retry.retryable_status_codes,
            BTreeSet::from([408, 429, 500, 502, 503, 504])
        );
        assert_eq!(
            config.default_headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn endpoint_url_joins_without_double_slash() {
        let config = ClientConfig::new("http://localhost:8000/api/").unwrap();
        assert_eq!(
            config.endpoint_url("/wallet/balance/").unwrap().as_str(),
            "http://localhost:8000/api/wallet/balance/"
        );
        assert_eq!(
            config.endpoint_url("auth/me/").unwrap().as_str(),
            "http://localhost:8000/api/auth/me/"
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = ClientConfig::default().with_timeout(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { ref field, .. }) if field == "timeout"
        ));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let result = ClientConfig::new("ftp://example.com/api");
        assert!(matches!(result, Err(Error::UnsupportedBaseUrl { .. })));
    }

    #[test]
    fn disabled_policy_makes_one_attempt() {
        let policy = RetryPolicy::disabled();
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.is_retryable_status(503));
    }

    #[test]
    fn enabled_policy_counts_retries_plus_first_attempt() {
        let policy = RetryPolicy {
            max_retries: 2,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.max_attempts(), 3);
        assert!(policy.is_retryable_status(503));
        assert!(!policy.is_retryable_status(404));
    }
}
