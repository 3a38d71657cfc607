//! Session and call-state layer between `talabin-api` and UI consumers.
//!
//! - **[`SessionStore`]**: the credential and cached identity, written
//!   through to a [`SessionStorage`](session::storage::SessionStorage)
//!   backend ([`MemoryStorage`](session::storage::MemoryStorage) or
//!   [`FileStorage`](session::storage::FileStorage)) with change
//!   notifications for every mutation.
//!
//! - **[`AuthClient`]**: bearer-token injection over the request executor,
//!   with one coalesced silent refresh on 401.
//!
//! - **[`SessionGuard`]**: gates protected views, recording the
//!   post-login redirect target and navigating to the login page through
//!   an injected [`Navigator`].
//!
//! - **[`ApiCall`]**: `{data, loading, error}` state around any
//!   envelope-returning call, observable through [`CallStateStream`].
//!
//! - **[`TalabinClient`]**: typed operations for auth, wallet, trading,
//!   prices and KYC.
//!
//! - **[`sync`]**: carries storage writes from other tabs or processes
//!   into the store.

pub mod auth;
pub mod call_state;
pub mod error;
pub mod guard;
pub mod services;
pub mod session;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use auth::AuthClient;
pub use call_state::{ApiCall, CallOptions, CallState, CallStateStream};
pub use error::CoreError;
pub use guard::{GuardHandle, GuardPaths, GuardState, Navigator, SessionGuard};
pub use services::TalabinClient;
pub use session::storage::{FileStorage, MemoryStorage, SessionStorage};
pub use session::{Credential, SessionEvent, SessionStore, SessionSubscription};
pub use sync::spawn_storage_sync;
