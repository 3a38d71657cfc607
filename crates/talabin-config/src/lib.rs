//! Configuration registry loading for Talabin tools.
//!
//! Layers built-in defaults, an optional TOML file and `TALABIN_*`
//! environment variables, then translates the result into the immutable
//! [`talabin_api::ClientConfig`] the executor is built from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use talabin_api::config::{
    DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES, DEFAULT_RETRYABLE_STATUS_CODES, DEFAULT_RETRY_DELAY,
    DEFAULT_TIMEOUT,
};
use talabin_api::{ClientConfig, RetryPolicy, TlsMode};

pub const ENV_PREFIX: &str = "TALABIN_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error(transparent)]
    Client(#[from] talabin_api::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Everything a Talabin tool reads from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_url: String,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    pub retry: RetrySettings,
    /// Extra headers sent with every request.
    pub headers: BTreeMap<String, String>,
    pub user_agent: Option<String>,
    /// Skip certificate verification. Local development only.
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,
    pub session: SessionSettings,
    pub output: OutputSettings,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timeout_ms: millis(DEFAULT_TIMEOUT),
            retry: RetrySettings::default(),
            headers: BTreeMap::new(),
            user_agent: None,
            insecure: false,
            ca_cert: None,
            session: SessionSettings::default(),
            output: OutputSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetrySettings {
    pub enabled: bool,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub retryable_status_codes: Vec<u16>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: millis(DEFAULT_RETRY_DELAY),
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSettings {
    pub login_path: String,
    pub landing_path: String,
    /// Session file; defaults to `session.json` in the data directory.
    pub file: Option<PathBuf>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            login_path: "/login".into(),
            landing_path: "/dashboard".into(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    /// `table` or `json`.
    pub format: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            format: "table".into(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("ir", "talabin", "talabin")
}

fn home_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".talabin");
    p
}

/// Platform config file location (`~/.config/talabin/config.toml` on Linux).
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Where the CLI keeps its session between invocations.
pub fn session_path(config: &FileConfig) -> PathBuf {
    if let Some(ref file) = config.session.file {
        return file.clone();
    }
    project_dirs().map_or_else(
        || home_fallback().join("session.json"),
        |dirs| dirs.data_dir().join("session.json"),
    )
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load from the platform config path plus environment.
pub fn load_config() -> Result<FileConfig, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) plus environment.
///
/// Nested keys use a double underscore: `TALABIN_RETRY__MAX_RETRIES=5`.
pub fn load_config_from(path: &Path) -> Result<FileConfig, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    Ok(figment.extract()?)
}

/// Render the effective configuration as TOML.
pub fn to_toml(config: &FileConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

// ── Translation ─────────────────────────────────────────────────────

impl FileConfig {
    /// Validate and freeze into the executor's configuration.
    pub fn to_client_config(&self) -> Result<ClientConfig, ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Validation {
                field: "timeout_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.insecure && self.ca_cert.is_some() {
            return Err(ConfigError::Validation {
                field: "insecure".into(),
                reason: "cannot be combined with ca_cert".into(),
            });
        }
        for path in [&self.session.login_path, &self.session.landing_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::Validation {
                    field: "session".into(),
                    reason: format!("path '{path}' must start with '/'"),
                });
            }
        }

        let tls = match (self.insecure, &self.ca_cert) {
            (true, _) => TlsMode::DangerAcceptInvalid,
            (false, Some(ca)) => TlsMode::CustomCa(ca.clone()),
            (false, None) => TlsMode::System,
        };
        let retry = RetryPolicy {
            enabled: self.retry.enabled,
            max_retries: self.retry.max_retries,
            retry_delay: Duration::from_millis(self.retry.retry_delay_ms),
            retryable_status_codes: self.retry.retryable_status_codes.iter().copied().collect(),
        };

        let mut config = ClientConfig::new(&self.base_url)?
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_retry(retry)
            .with_tls(tls);
        for (name, value) in &self.headers {
            config = config.with_header(name, value);
        }
        if let Some(ref agent) = self.user_agent {
            config.user_agent.clone_from(agent);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_match_client_defaults() {
        let config = FileConfig::default().to_client_config().unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8000/api");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry, RetryPolicy::default());
        assert_eq!(config.tls, TlsMode::System);
    }

    #[test]
    fn file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                base_url = "https://api.talabin.ir/api"
                timeout_ms = 5000

                [retry]
                max_retries = 1

                [headers]
                X-Client = "cli"

                [session]
                landing_path = "/dashboard/wallet"
                "#,
            )?;
            jail.set_env("TALABIN_TIMEOUT_MS", "7000");
            jail.set_env("TALABIN_RETRY__RETRY_DELAY_MS", "250");

            let loaded = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(loaded.base_url, "https://api.talabin.ir/api");
            assert_eq!(loaded.timeout_ms, 7000);
            assert_eq!(loaded.retry.max_retries, 1);
            assert_eq!(loaded.retry.retry_delay_ms, 250);
            assert!(loaded.retry.enabled);
            assert_eq!(loaded.session.login_path, "/login");
            assert_eq!(loaded.session.landing_path, "/dashboard/wallet");

            let client = loaded.to_client_config().map_err(|e| e.to_string())?;
            assert_eq!(client.timeout, Duration::from_millis(7000));
            assert_eq!(client.retry.retry_delay, Duration::from_millis(250));
            assert_eq!(client.default_headers.get("X-Client").unwrap(), "cli");
            assert_eq!(client.default_headers.get("Accept").unwrap(), "application/json");
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_| {
            let loaded = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
            assert_eq!(loaded, FileConfig::default());
            Ok(())
        });
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = FileConfig {
            timeout_ms: 0,
            ..FileConfig::default()
        };
        assert!(matches!(
            config.to_client_config(),
            Err(ConfigError::Validation { ref field, .. }) if field == "timeout_ms"
        ));
    }

    #[test]
    fn non_http_base_url_rejected() {
        let config = FileConfig {
            base_url: "ftp://files.talabin.ir".into(),
            ..FileConfig::default()
        };
        assert!(matches!(config.to_client_config(), Err(ConfigError::Client(_))));
    }

    #[test]
    fn tls_modes() {
        let insecure = FileConfig {
            insecure: true,
            ..FileConfig::default()
        };
        assert_eq!(
            insecure.to_client_config().unwrap().tls,
            TlsMode::DangerAcceptInvalid
        );

        let both = FileConfig {
            insecure: true,
            ca_cert: Some("/etc/ca.pem".into()),
            ..FileConfig::default()
        };
        assert!(both.to_client_config().is_err());
    }

    #[test]
    fn session_file_override() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("s.json");
        let config = FileConfig {
            session: SessionSettings {
                file: Some(file.clone()),
                ..SessionSettings::default()
            },
            ..FileConfig::default()
        };
        assert_eq!(session_path(&config), file);
        assert!(session_path(&FileConfig::default()).ends_with("session.json"));
    }

    #[test]
    fn renders_toml() {
        let rendered = to_toml(&FileConfig::default()).unwrap();
        assert!(rendered.contains("base_url = \"http://localhost:8000/api\""));
        assert!(rendered.contains("[retry]"));
    }
}
