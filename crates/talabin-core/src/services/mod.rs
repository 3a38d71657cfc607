// Typed service facade
//
// One method per backend operation, grouped by area in the sibling files.
// Everything funnels through `AuthClient`, so credential injection and
// refresh behave the same for every endpoint; methods return the envelope
// unchanged apart from the session side effects of login and logout.

mod auth;
mod kyc;
mod prices;
mod trading;
mod wallet;

use std::sync::Arc;

use talabin_api::{ClientConfig, RequestExecutor};

use crate::auth::AuthClient;
use crate::error::CoreError;
use crate::session::SessionStore;
use crate::session::storage::SessionStorage;

/// Entry point for talking to the Talabin backend. Cheap to clone.
#[derive(Clone)]
pub struct TalabinClient {
    auth: AuthClient,
}

impl TalabinClient {
    /// Build the executor for `config` and load the session from `storage`.
    pub fn new(config: ClientConfig, storage: Arc<dyn SessionStorage>) -> Result<Self, CoreError> {
        let executor = RequestExecutor::new(config)?;
        let store = SessionStore::open(storage)?;
        Ok(Self::from_auth(AuthClient::new(executor, store)))
    }

    pub fn from_auth(auth: AuthClient) -> Self {
        Self { auth }
    }

    pub fn auth_client(&self) -> &AuthClient {
        &self.auth
    }

    pub fn store(&self) -> &SessionStore {
        self.auth.store()
    }
}
