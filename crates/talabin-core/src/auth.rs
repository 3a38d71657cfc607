// ── Auth interceptor ──
//
// Wraps the request executor with bearer-token injection and a single
// silent refresh on 401. Refreshes are serialized behind an async gate:
// the first caller to take it refreshes, later callers find the stored
// credential already changed (or cleared) and reuse that outcome.

use std::sync::Arc;

use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use talabin_api::endpoints::auth as auth_endpoints;
use talabin_api::models::{RefreshRequest, RefreshResponse};
use talabin_api::{ApiError, ApiRequest, ErrorKind, RequestExecutor, ResponseEnvelope};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::session::{Credential, SessionStore};

struct AuthInner {
    executor: RequestExecutor,
    store: SessionStore,
    refresh_gate: Mutex<()>,
}

/// Credential-aware front of the [`RequestExecutor`]. Cheap to clone.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthInner>,
}

impl AuthClient {
    pub fn new(executor: RequestExecutor, store: SessionStore) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                executor,
                store,
                refresh_gate: Mutex::new(()),
            }),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.inner.executor
    }

    /// Execute `request` as the current user.
    ///
    /// Public auth endpoints are sent without credentials. Otherwise a
    /// missing credential yields `Unauthenticated` without touching the
    /// network, and a 401 triggers at most one refresh-and-retry.
    pub async fn execute<T: DeserializeOwned>(&self, request: &ApiRequest) -> ResponseEnvelope<T> {
        if auth_endpoints::is_public(&request.path) {
            return self.execute_public(request).await;
        }

        let Some(credential) = self.inner.store.credential() else {
            debug!("no credential for {} {}", request.method, request.path);
            return ResponseEnvelope::failure(ApiError::from_kind(ErrorKind::Unauthenticated));
        };

        let first = self.send_as(request, &credential).await;
        if !first.error().is_some_and(ApiError::is_auth_failure) {
            return first;
        }

        debug!("401 from {}; attempting token refresh", request.path);
        match self.renew(&credential).await {
            Some(renewed) => self.send_as(request, &renewed).await,
            None => ResponseEnvelope::failure(ApiError::from_kind(ErrorKind::SessionExpired)),
        }
    }

    /// Execute without credential injection.
    pub async fn execute_public<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> ResponseEnvelope<T> {
        self.inner.executor.execute(request).await
    }

    /// Refresh ahead of time when the stored access token has expired.
    ///
    /// Returns whether the session is usable afterwards. Shares the
    /// refresh gate with 401-driven refreshes.
    pub async fn refresh_if_expired(&self) -> bool {
        let Some(credential) = self.inner.store.credential() else {
            return false;
        };
        if !credential.is_expired() {
            return true;
        }
        debug!("access token expired; refreshing before use");
        self.renew(&credential).await.is_some()
    }

    async fn send_as<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        credential: &Credential,
    ) -> ResponseEnvelope<T> {
        let authorized = request.clone().header("Authorization", credential.bearer());
        self.inner.executor.execute(&authorized).await
    }

    /// Obtain a credential newer than `stale`, refreshing at most once
    /// across all concurrent callers. `None` means the session is gone.
    async fn renew(&self, stale: &Credential) -> Option<Credential> {
        let _gate = self.inner.refresh_gate.lock().await;

        match self.inner.store.credential() {
            None => {
                debug!("session cleared while request was in flight");
                return None;
            }
            Some(current) if current != *stale => {
                debug!("credential already refreshed by another caller");
                return Some(current);
            }
            Some(_) => {}
        }

        let request = ApiRequest::post(auth_endpoints::REFRESH_TOKEN).json(&RefreshRequest {
            refresh: stale.refresh_token().expose_secret(),
        });
        let outcome = self
            .inner
            .executor
            .execute_once::<RefreshResponse>(&request)
            .await;

        match outcome.into_result() {
            Ok(tokens) => {
                let renewed = stale.refreshed(tokens.access, tokens.refresh);
                match self.inner.store.replace_credential(stale, renewed.clone()) {
                    Ok(true) => {
                        info!("access token refreshed");
                        Some(renewed)
                    }
                    Ok(false) => {
                        debug!("session changed during refresh; discarding new tokens");
                        None
                    }
                    Err(e) => {
                        // Held in memory only; the next process will need a fresh login.
                        warn!("refreshed credential could not be persisted: {e}");
                        Some(renewed)
                    }
                }
            }
            Err(error) => {
                warn!(kind = ?error.kind, status = ?error.status, "token refresh failed; ending session");
                if let Err(e) = self.inner.store.clear() {
                    warn!("failed to clear session after refresh failure: {e}");
                }
                None
            }
        }
    }
}
