//! Per-invocation wiring: configuration, session file, client and guard.

use std::future::Future;
use std::sync::{Arc, Mutex};

use clap::ValueEnum;
use tokio_stream::StreamExt as _;
use tracing::{debug, trace};

use talabin_api::ResponseEnvelope;
use talabin_config::FileConfig;
use talabin_core::{
    ApiCall, FileStorage, GuardHandle, GuardPaths, GuardState, Navigator, SessionGuard,
    SessionStore, TalabinClient,
};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// A command's place in the app, used as the post-login redirect target.
pub mod route {
    pub const PROFILE: &str = "/dashboard/profile";
    pub const WALLET: &str = "/dashboard/wallet";
    pub const TRADE: &str = "/dashboard/trade";
    pub const PRICES: &str = "/dashboard/prices";
    pub const KYC: &str = "/dashboard/kyc";
    pub const LOGIN: &str = "/login";
}

/// The command to suggest after login for a recorded route.
pub fn route_hint(route: &str) -> Option<&'static str> {
    match route.split('?').next().unwrap_or(route) {
        route::WALLET => Some("talabin wallet balance"),
        route::TRADE => Some("talabin trade orders"),
        route::PRICES => Some("talabin price current"),
        route::KYC => Some("talabin kyc status"),
        route::PROFILE => Some("talabin whoami"),
        _ => None,
    }
}

// ── Navigator ────────────────────────────────────────────────────────

/// The "location" of a CLI invocation is the route of the command being
/// run; navigation is recorded and reported by the caller.
pub struct CliNavigator {
    location: String,
    navigated_to: Mutex<Option<String>>,
}

impl CliNavigator {
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_owned(),
            navigated_to: Mutex::new(None),
        }
    }

    pub fn navigated_to(&self) -> Option<String> {
        self.navigated_to
            .lock()
            .expect("navigator lock poisoned")
            .clone()
    }
}

impl Navigator for CliNavigator {
    fn current_location(&self) -> String {
        self.location.clone()
    }

    fn navigate(&self, to: &str) {
        debug!(to, "navigation requested");
        *self.navigated_to.lock().expect("navigator lock poisoned") = Some(to.to_owned());
    }
}

// ── Context ──────────────────────────────────────────────────────────

pub struct AppContext {
    pub config: FileConfig,
    pub client: TalabinClient,
    pub guard: SessionGuard,
    pub format: OutputFormat,
    pub quiet: bool,
    navigator: Arc<CliNavigator>,
}

impl AppContext {
    /// Load config, apply flag overrides, and open the session file.
    pub fn build(global: &GlobalOpts, location: &str) -> Result<Self, CliError> {
        let config = effective_config(global)?;
        let format = output_format(global, &config)?;
        let client_config = config.to_client_config()?;

        let session_file = talabin_config::session_path(&config);
        debug!(path = %session_file.display(), "opening session file");
        let storage = Arc::new(FileStorage::open(session_file)?);
        let client = TalabinClient::new(client_config, storage)?;

        let navigator = Arc::new(CliNavigator::new(location));
        let paths = GuardPaths {
            login: config.session.login_path.clone(),
            landing: config.session.landing_path.clone(),
        };
        let guard = SessionGuard::new(client.store().clone(), navigator.clone(), paths);

        Ok(Self {
            config,
            client,
            guard,
            format,
            quiet: global.quiet,
            navigator,
        })
    }

    pub fn store(&self) -> &SessionStore {
        self.client.store()
    }

    /// Gate a protected command on the stored session. An expired access
    /// token is refreshed first so a valid refresh token keeps the user in.
    ///
    /// The returned handle keeps the guard mounted; hold it for as long as
    /// the command runs.
    pub async fn require_session(&self) -> Result<GuardHandle, CliError> {
        if self.store().credential().is_some() {
            self.client.auth_client().refresh_if_expired().await;
        }
        let handle = self.guard.mount();
        match handle.state() {
            GuardState::Authenticated => Ok(handle),
            GuardState::Unauthenticated | GuardState::Unknown => {
                debug!(to = ?self.navigator.navigated_to(), "guard sent us to login");
                Err(CliError::NotSignedIn)
            }
        }
    }

    /// Run one service call under an [`ApiCall`] tracker, tracing each
    /// state it passes through, and hand back the envelope it produced.
    pub async fn track<T, F, Fut>(&self, what: &'static str, call: F) -> ResponseEnvelope<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(TalabinClient) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResponseEnvelope<T>> + Send + 'static,
    {
        let tracker = ApiCall::new(call);
        let states = tracker.subscribe().into_stream();
        let watcher = tokio::spawn(async move {
            tokio::pin!(states);
            while let Some(state) = states.next().await {
                trace!(what, loading = state.loading, error = ?state.error, "call state");
            }
        });

        let envelope = tracker.execute(self.client.clone()).await;
        let settled = tracker.state();
        debug!(
            what,
            ok = settled.data.is_some(),
            error = ?settled.error,
            "call settled"
        );

        // Dropping the only tracker closes the state stream.
        drop(tracker);
        if let Err(e) = watcher.await {
            debug!("call state watcher ended abnormally: {e}");
        }
        envelope
    }

    /// [`track`](Self::track) a call and unwrap its data.
    pub async fn fetch<T, F, Fut>(&self, what: &'static str, call: F) -> Result<T, CliError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(TalabinClient) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResponseEnvelope<T>> + Send + 'static,
    {
        let envelope = self.track(what, call).await;
        self.data(envelope)
    }

    /// Unwrap an envelope into its data or a CLI error.
    pub fn data<T>(&self, envelope: ResponseEnvelope<T>) -> Result<T, CliError> {
        envelope
            .into_result()
            .map_err(|e| CliError::from_api(e, &self.config.base_url))
    }
}

fn effective_config(global: &GlobalOpts) -> Result<FileConfig, CliError> {
    let mut config = talabin_config::load_config()?;
    if let Some(ref url) = global.base_url {
        config.base_url.clone_from(url);
    }
    if let Some(timeout_ms) = global.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if global.insecure {
        config.insecure = true;
        config.ca_cert = None;
    }
    Ok(config)
}

fn output_format(global: &GlobalOpts, config: &FileConfig) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    OutputFormat::from_str(&config.output.format, true).map_err(|reason| CliError::Validation {
        field: "output.format".into(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_ignore_query() {
        assert_eq!(route_hint("/dashboard/wallet?tab=2"), Some("talabin wallet balance"));
        assert_eq!(route_hint("/dashboard"), None);
    }

    #[test]
    fn navigator_records_last_target() {
        let nav = CliNavigator::new(route::TRADE);
        assert_eq!(nav.current_location(), "/dashboard/trade");
        assert_eq!(nav.navigated_to(), None);
        nav.navigate(route::LOGIN);
        assert_eq!(nav.navigated_to().as_deref(), Some("/login"));
    }
}
