// ── Session guard ──
//
// Gates a protected view on the session. Mounting evaluates once
// synchronously, then re-evaluates on every session event until the
// returned handle is dropped. Entering `Unauthenticated` records where the
// user was and sends them to the login entry point; staying there does not
// navigate again.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::session::SessionStore;

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_LANDING_PATH: &str = "/dashboard";

/// Guard evaluation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Not evaluated yet; render a placeholder.
    Unknown,
    Authenticated,
    Unauthenticated,
}

/// Where the user is and how to send them elsewhere.
pub trait Navigator: Send + Sync + 'static {
    fn current_location(&self) -> String;
    fn navigate(&self, to: &str);
}

/// Paths the guard redirects between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPaths {
    pub login: String,
    /// Post-login destination when no redirect target was recorded.
    pub landing: String,
}

impl Default for GuardPaths {
    fn default() -> Self {
        Self {
            login: DEFAULT_LOGIN_PATH.into(),
            landing: DEFAULT_LANDING_PATH.into(),
        }
    }
}

struct GuardInner {
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    paths: GuardPaths,
    state: watch::Sender<GuardState>,
}

#[derive(Clone)]
pub struct SessionGuard {
    inner: Arc<GuardInner>,
}

impl SessionGuard {
    pub fn new(store: SessionStore, navigator: Arc<dyn Navigator>, paths: GuardPaths) -> Self {
        let (state, _) = watch::channel(GuardState::Unknown);
        Self {
            inner: Arc::new(GuardInner {
                store,
                navigator,
                paths,
                state,
            }),
        }
    }

    pub fn state(&self) -> GuardState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.inner.state.subscribe()
    }

    pub fn paths(&self) -> &GuardPaths {
        &self.inner.paths
    }

    /// Re-check the session and apply redirect side effects on a
    /// transition into `Unauthenticated`.
    pub fn evaluate(&self) -> GuardState {
        let next = if self.inner.store.is_authenticated() {
            GuardState::Authenticated
        } else {
            GuardState::Unauthenticated
        };
        let previous = self.inner.state.send_replace(next);

        if next == GuardState::Unauthenticated && previous != GuardState::Unauthenticated {
            self.redirect_to_login();
        }
        next
    }

    fn redirect_to_login(&self) {
        let location = self.inner.navigator.current_location();
        let login = &self.inner.paths.login;
        if !is_login_location(&location, login) {
            if let Err(e) = self.inner.store.set_redirect_target(&location) {
                warn!("could not record redirect target: {e}");
            }
        }
        debug!(from = %location, "session missing; redirecting to {login}");
        self.inner.navigator.navigate(login);
    }

    /// Start guarding: evaluates immediately, then on every session event
    /// until the returned handle is dropped. Requires a tokio runtime.
    pub fn mount(&self) -> GuardHandle {
        let mut events = self.inner.store.subscribe();
        self.evaluate();

        let cancel = CancellationToken::new();
        let guard = self.clone();
        let token = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    event = events.recv() => match event {
                        Some(event) => {
                            debug!(?event, "session event; re-evaluating guard");
                            guard.evaluate();
                        }
                        None => break,
                    },
                }
            }
        });

        GuardHandle {
            state: self.subscribe(),
            cancel,
        }
    }

    /// Where to go after a successful login: the recorded redirect target
    /// (consumed), else the landing path.
    pub fn post_login_destination(&self) -> String {
        match self.inner.store.take_redirect_target() {
            Ok(Some(target)) if !is_login_location(&target, &self.inner.paths.login) => target,
            Ok(_) => self.inner.paths.landing.clone(),
            Err(e) => {
                warn!("could not read redirect target: {e}");
                self.inner.paths.landing.clone()
            }
        }
    }
}

/// `/login`, `/login/` and `/login?next=..` all count as the login page.
fn is_login_location(location: &str, login: &str) -> bool {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    path.trim_end_matches('/') == login.trim_end_matches('/')
}

/// Live guard subscription; unsubscribes when dropped.
pub struct GuardHandle {
    state: watch::Receiver<GuardState>,
    cancel: CancellationToken,
}

impl GuardHandle {
    pub fn state(&self) -> GuardState {
        *self.state.borrow()
    }

    /// Wait for the next state change. `None` if the guard is gone.
    pub async fn changed(&mut self) -> Option<GuardState> {
        self.state.changed().await.ok()?;
        Some(*self.state.borrow_and_update())
    }

    pub fn unmount(self) {}
}

impl Drop for GuardHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
