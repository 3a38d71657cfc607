// ── Session store ──
//
// Owns the credential and cached identity. Every mutation writes through to
// the storage backend before returning, then notifies subscribers. Nothing
// else in the crate writes session keys.

mod credential;
pub mod storage;

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use talabin_api::models::User;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub use self::credential::Credential;
use self::storage::{
    ACCESS_TOKEN_KEY, REDIRECT_KEY, REFRESH_TOKEN_KEY, SessionStorage, TOKEN_EXPIRES_AT_KEY,
    USER_KEY,
};
use crate::error::CoreError;

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Keys removed by [`SessionStore::clear`]. The redirect target survives.
const SESSION_KEYS: [&str; 4] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TOKEN_EXPIRES_AT_KEY, USER_KEY];

/// What changed in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A credential was stored (login or refresh).
    CredentialSet,
    /// The cached identity was replaced.
    IdentityChanged,
    /// Logout or an unrecoverable auth failure.
    Cleared,
    /// Another tab or process changed the persisted session, or events
    /// were missed; re-read state.
    ExternalChange,
}

/// Handle returned by [`SessionStore::subscribe`]. Dropping it
/// unsubscribes.
pub struct SessionSubscription {
    rx: broadcast::Receiver<SessionEvent>,
}

impl SessionSubscription {
    /// Next event, or `None` once the store is gone.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(_)) => Some(SessionEvent::ExternalChange),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[derive(Default, PartialEq)]
struct Snapshot {
    credential: Option<Credential>,
    identity: Option<User>,
}

struct StoreInner {
    storage: Arc<dyn SessionStorage>,
    cache: RwLock<Snapshot>,
    events: broadcast::Sender<SessionEvent>,
}

/// Shared session state. Cheap to clone.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    /// Load the persisted session from `storage`.
    pub fn open(storage: Arc<dyn SessionStorage>) -> Result<Self, CoreError> {
        let snapshot = load(storage.as_ref())?;
        if snapshot.credential.is_some() {
            debug!("restored persisted session");
        }
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            inner: Arc::new(StoreInner {
                storage,
                cache: RwLock::new(snapshot),
                events,
            }),
        })
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.inner.storage
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn credential(&self) -> Option<Credential> {
        self.read().credential.clone()
    }

    pub fn identity(&self) -> Option<User> {
        self.read().identity.clone()
    }

    /// `true` iff a credential is present and not past its expiry.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated_at(Utc::now())
    }

    pub fn is_authenticated_at(&self, now: DateTime<Utc>) -> bool {
        self.read()
            .credential
            .as_ref()
            .is_some_and(|c| !c.is_expired_at(now))
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn set_credential(&self, credential: Credential) -> Result<(), CoreError> {
        let mut cache = self.write();
        self.inner
            .storage
            .apply(&as_borrowed(&credential_writes(&credential)))?;
        cache.credential = Some(credential);
        drop(cache);
        self.emit(SessionEvent::CredentialSet);
        Ok(())
    }

    /// Store credential and identity together (login).
    pub fn set_session(&self, credential: Credential, identity: User) -> Result<(), CoreError> {
        let user_json = encode_user(&identity)?;
        let mut cache = self.write();
        let mut writes = credential_writes(&credential);
        writes.push((USER_KEY, Some(user_json)));
        self.inner.storage.apply(&as_borrowed(&writes))?;
        cache.credential = Some(credential);
        cache.identity = Some(identity);
        drop(cache);
        info!("session established");
        self.emit(SessionEvent::CredentialSet);
        Ok(())
    }

    pub fn set_identity(&self, identity: User) -> Result<(), CoreError> {
        let user_json = encode_user(&identity)?;
        let mut cache = self.write();
        self.inner.storage.set(USER_KEY, &user_json)?;
        cache.identity = Some(identity);
        drop(cache);
        self.emit(SessionEvent::IdentityChanged);
        Ok(())
    }

    /// Replace the credential only if it is still `expected`.
    ///
    /// Used after a refresh: if logout (or another tab) changed the
    /// session meanwhile, the refreshed tokens are discarded and `false`
    /// is returned.
    ///
    /// The old tokens are already spent once the server has rotated them,
    /// so the in-memory credential is replaced even when persisting fails;
    /// the storage error is still returned.
    pub(crate) fn replace_credential(
        &self,
        expected: &Credential,
        next: Credential,
    ) -> Result<bool, CoreError> {
        let mut cache = self.write();
        if cache.credential.as_ref() != Some(expected) {
            return Ok(false);
        }
        let persisted = self
            .inner
            .storage
            .apply(&as_borrowed(&credential_writes(&next)));
        cache.credential = Some(next);
        drop(cache);
        self.emit(SessionEvent::CredentialSet);
        persisted.map(|()| true)
    }

    /// Remove credential and identity from memory and storage.
    pub fn clear(&self) -> Result<(), CoreError> {
        let mut cache = self.write();
        let removals: Vec<(&str, Option<&str>)> = SESSION_KEYS.iter().map(|k| (*k, None)).collect();
        self.inner.storage.apply(&removals)?;
        let had_session = cache.credential.is_some();
        *cache = Snapshot::default();
        drop(cache);
        if had_session {
            info!("session cleared");
        }
        self.emit(SessionEvent::Cleared);
        Ok(())
    }

    /// Re-read persisted state. If it differs from the cache, the cache
    /// is replaced, `ExternalChange` is emitted and `true` returned.
    pub fn sync_from_storage(&self) -> Result<bool, CoreError> {
        let fresh = load(self.inner.storage.as_ref())?;
        let mut cache = self.write();
        if *cache == fresh {
            return Ok(false);
        }
        *cache = fresh;
        drop(cache);
        debug!("session changed externally");
        self.emit(SessionEvent::ExternalChange);
        Ok(true)
    }

    // ── Redirect-after-login ─────────────────────────────────────────

    pub fn set_redirect_target(&self, path: &str) -> Result<(), CoreError> {
        self.inner.storage.set(REDIRECT_KEY, path)
    }

    pub fn redirect_target(&self) -> Result<Option<String>, CoreError> {
        self.inner.storage.get(REDIRECT_KEY)
    }

    /// Read and remove the redirect target.
    pub fn take_redirect_target(&self) -> Result<Option<String>, CoreError> {
        let target = self.inner.storage.get(REDIRECT_KEY)?;
        if target.is_some() {
            self.inner.storage.remove(REDIRECT_KEY)?;
        }
        Ok(target)
    }

    // ── Notifications ────────────────────────────────────────────────

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.inner.events.subscribe(),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // Sending fails only when nobody is subscribed.
        let _ = self.inner.events.send(event);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        self.inner.cache.read().expect("session cache lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Snapshot> {
        self.inner.cache.write().expect("session cache lock poisoned")
    }
}

fn credential_writes(credential: &Credential) -> Vec<(&'static str, Option<String>)> {
    vec![
        (
            ACCESS_TOKEN_KEY,
            Some(credential.access_token().expose_secret().to_owned()),
        ),
        (
            REFRESH_TOKEN_KEY,
            Some(credential.refresh_token().expose_secret().to_owned()),
        ),
        (
            TOKEN_EXPIRES_AT_KEY,
            credential.expires_at().map(|at| at.to_rfc3339()),
        ),
    ]
}

fn as_borrowed<'a>(writes: &'a [(&'a str, Option<String>)]) -> Vec<(&'a str, Option<&'a str>)> {
    writes.iter().map(|(k, v)| (*k, v.as_deref())).collect()
}

fn encode_user(user: &User) -> Result<String, CoreError> {
    serde_json::to_string(user).map_err(|e| CoreError::Encode {
        key: USER_KEY.into(),
        reason: e.to_string(),
    })
}

/// Read the persisted session. Undecodable entries are dropped with a
/// warning rather than failing the whole load.
fn load(storage: &dyn SessionStorage) -> Result<Snapshot, CoreError> {
    let access = storage.get(ACCESS_TOKEN_KEY)?;
    let refresh = storage.get(REFRESH_TOKEN_KEY)?;
    let credential = match (access, refresh) {
        (Some(access), Some(refresh)) => {
            let credential = Credential::new(access, refresh);
            Some(match storage.get(TOKEN_EXPIRES_AT_KEY)? {
                Some(raw) => match DateTime::parse_from_rfc3339(&raw) {
                    Ok(at) => credential.with_expiry(Some(at.with_timezone(&Utc))),
                    Err(e) => {
                        warn!("ignoring unreadable token expiry: {e}");
                        credential
                    }
                },
                None => credential.with_expiry(None),
            })
        }
        (Some(_), None) | (None, Some(_)) => {
            warn!("persisted session is missing a token; treating as logged out");
            None
        }
        (None, None) => None,
    };

    let identity = match storage.get(USER_KEY)? {
        Some(raw) => match serde_json::from_str::<User>(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("ignoring unreadable cached user: {e}");
                None
            }
        },
        None => None,
    };

    Ok(Snapshot {
        credential,
        identity,
    })
}
