#![allow(clippy::unwrap_used)]
// End-to-end session tests: facade → interceptor → executor → wiremock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use talabin_api::{ClientConfig, ErrorKind, RetryPolicy};
use talabin_core::{
    ApiCall, CoreError, Credential, GuardPaths, GuardState, MemoryStorage, Navigator,
    SessionGuard, SessionStorage, TalabinClient,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, TalabinClient) {
    let server = MockServer::start().await;
    let config = ClientConfig::new(&server.uri()).unwrap().with_retry(RetryPolicy {
        max_retries: 1,
        retry_delay: Duration::from_millis(10),
        ..RetryPolicy::default()
    });
    let client = TalabinClient::new(config, Arc::new(MemoryStorage::new())).unwrap();
    (server, client)
}

fn wallet_body() -> serde_json::Value {
    json!({
        "success": true,
        "data": {"balance_irr": "2500000.00", "gold_balance": "1.2500"}
    })
}

fn user_body() -> serde_json::Value {
    json!({
        "id": 12,
        "phone_number": "09123456789",
        "first_name": "Sara",
        "last_name": "Ahmadi",
        "full_name": "Sara Ahmadi",
        "is_verified": true,
        "verification_status": "verified"
    })
}

async fn refresh_calls(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/auth/token/refresh/")
        .count()
}

struct FixedNavigator {
    location: String,
    visits: Mutex<Vec<String>>,
}

impl Navigator for FixedNavigator {
    fn current_location(&self) -> String {
        self.location.clone()
    }

    fn navigate(&self, to: &str) {
        self.visits.lock().unwrap().push(to.to_owned());
    }
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_persists_session_and_authorizes_later_calls() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .and(body_json(json!({"phone_number": "09123456789", "password": "otp123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "ورود با موفقیت انجام شد",
            "data": {"user": user_body(), "tokens": {"access": "A1", "refresh": "R1"}}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wallet/balance/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wallet_body()))
        .expect(1)
        .mount(&server)
        .await;

    let login = client.login("09123456789", "otp123").await;
    assert_eq!(login.data().unwrap().full_name, "Sara Ahmadi");
    assert_eq!(login.message(), Some("ورود با موفقیت انجام شد"));

    let credential = client.store().credential().unwrap();
    assert_eq!(credential.access_token().expose_secret(), "A1");
    assert_eq!(credential.refresh_token().expose_secret(), "R1");
    assert!(client.store().is_authenticated());
    assert_eq!(client.store().identity().unwrap().id, 12);

    let balance = client.wallet_balance().await;
    assert_eq!(balance.data().unwrap().balance_irr, "2500000.00");

    let requests = server.received_requests().await.unwrap();
    let login_request = requests
        .iter()
        .find(|r| r.url.path() == "/auth/login/")
        .unwrap();
    assert!(login_request.headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_failed_login_leaves_store_empty() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": {"message": "شماره تلفن یا رمز عبور اشتباه است"}
        })))
        .mount(&server)
        .await;

    let login = client.login("09123456789", "wrong").await;

    let error = login.error().unwrap();
    assert_eq!(error.kind, ErrorKind::Unauthorized);
    assert_eq!(error.message, "شماره تلفن یا رمز عبور اشتباه است");
    assert!(!client.store().is_authenticated());
    assert_eq!(refresh_calls(&server).await, 0);
}

#[tokio::test]
async fn test_protected_call_without_session_never_hits_network() {
    let (server, client) = setup().await;

    let envelope = client.wallet_balance().await;

    assert_eq!(envelope.error().unwrap().kind, ErrorKind::Unauthenticated);
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ── Refresh ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_401_refreshes_once_and_retries_with_new_token() {
    let (server, client) = setup().await;
    client
        .store()
        .set_credential(Credential::new("A1", "R1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/auth/me/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Given token not valid for any token type",
            "code": "token_not_valid"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me/"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": user_body()})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let me = client.me().await;

    assert_eq!(me.data().unwrap().phone_number, "09123456789");
    let credential = client.store().credential().unwrap();
    assert_eq!(credential.access_token().expose_secret(), "A2");
    assert_eq!(credential.refresh_token().expose_secret(), "R1");
    assert_eq!(client.store().identity().unwrap().id, 12);
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let (server, client) = setup().await;
    client
        .store()
        .set_credential(Credential::new("A1", "R1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/wallet/balance/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "A2", "refresh": "R2"}))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wallet/balance/"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wallet_body()))
        .expect(5)
        .mount(&server)
        .await;

    let calls = (0..5).map(|_| client.wallet_balance());
    let results = futures_util::future::join_all(calls).await;

    assert!(results.iter().all(talabin_api::ResponseEnvelope::is_success));
    assert_eq!(refresh_calls(&server).await, 1);
    let credential = client.store().credential().unwrap();
    assert_eq!(credential.refresh_token().expose_secret(), "R2");
}

/// Session storage that stops accepting writes once `read_only` is set,
/// as a full disk or a revoked file permission would.
struct ReadOnlyAfter {
    inner: MemoryStorage,
    read_only: AtomicBool,
}

impl SessionStorage for ReadOnlyAfter {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        self.inner.get(key)
    }

    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<(), CoreError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(CoreError::StorageIo {
                path: "session.json".into(),
                source: std::io::Error::other("read-only file system"),
            });
        }
        self.inner.apply(changes)
    }
}

#[tokio::test]
async fn test_unpersisted_refresh_is_still_shared_by_concurrent_callers() {
    let server = MockServer::start().await;
    let config = ClientConfig::new(&server.uri())
        .unwrap()
        .with_retry(RetryPolicy::disabled());
    let storage = Arc::new(ReadOnlyAfter {
        inner: MemoryStorage::new(),
        read_only: AtomicBool::new(false),
    });
    let client = TalabinClient::new(config, storage.clone()).unwrap();
    client
        .store()
        .set_credential(Credential::new("A1", "R1"))
        .unwrap();
    storage.read_only.store(true, Ordering::SeqCst);

    Mock::given(method("GET"))
        .and(path("/auth/me/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "A2"}))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/me/"))
        .and(header("authorization", "Bearer A2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": user_body()
        })))
        .mount(&server)
        .await;

    let (a, b) = tokio::join!(client.me(), client.me());

    assert!(a.is_success());
    assert!(b.is_success());
    assert_eq!(refresh_calls(&server).await, 1);
    let credential = client.store().credential().unwrap();
    assert_eq!(credential.access_token().expose_secret(), "A2");
    assert_eq!(credential.refresh_token().expose_secret(), "R1");
    assert_eq!(
        storage.inner.get("access_token").unwrap().as_deref(),
        Some("A1")
    );
}

#[tokio::test]
async fn test_rejected_refresh_expires_session_and_guard_redirects() {
    let (server, client) = setup().await;
    client
        .store()
        .set_credential(Credential::new("A1", "R1"))
        .unwrap();

    let navigator = Arc::new(FixedNavigator {
        location: "/dashboard/wallet".into(),
        visits: Mutex::new(Vec::new()),
    });
    let guard = SessionGuard::new(
        client.store().clone(),
        navigator.clone(),
        GuardPaths::default(),
    );
    let mut mounted = guard.mount();
    assert_eq!(mounted.state(), GuardState::Authenticated);

    Mock::given(method("GET"))
        .and(path("/wallet/balance/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token is blacklisted", "code": "token_not_valid"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client.wallet_balance().await;

    assert_eq!(envelope.error().unwrap().kind, ErrorKind::SessionExpired);
    assert!(client.store().credential().is_none());

    let state = tokio::time::timeout(Duration::from_secs(1), mounted.changed())
        .await
        .unwrap();
    assert_eq!(state, Some(GuardState::Unauthenticated));
    assert_eq!(*navigator.visits.lock().unwrap(), vec!["/login".to_owned()]);
    assert_eq!(guard.post_login_destination(), "/dashboard/wallet");
}

#[tokio::test]
async fn test_logout_during_flight_skips_refresh() {
    let (server, client) = setup().await;
    client
        .store()
        .set_credential(Credential::new("A1", "R1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/trading/orders/"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(200)))
        .mount(&server)
        .await;

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.orders().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    client.store().clear().unwrap();

    let envelope = pending.await.unwrap();
    assert_eq!(envelope.error().unwrap().kind, ErrorKind::SessionExpired);
    assert_eq!(refresh_calls(&server).await, 0);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_ahead_of_use() {
    let (server, client) = setup().await;
    let expired =
        Credential::new("A1", "R1").with_expiry(Some(Utc::now() - chrono::Duration::minutes(5)));
    client.store().set_credential(expired).unwrap();
    assert!(!client.store().is_authenticated());

    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.auth_client().refresh_if_expired().await);
    assert!(client.store().is_authenticated());
    assert!(client.auth_client().refresh_if_expired().await);
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_clears_even_when_server_fails() {
    let (server, client) = setup().await;
    client
        .store()
        .set_credential(Credential::new("A1", "R1"))
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/auth/logout/"))
        .and(header("authorization", "Bearer A1"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false, "error": {"message": "خطا در خروج از حساب کاربری"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.logout().await.unwrap();

    assert!(client.store().credential().is_none());
    assert!(!client.store().is_authenticated());
}

// ── Call state over real calls ──────────────────────────────────────

#[tokio::test]
async fn test_call_state_tracks_wallet_balance() {
    let (server, client) = setup().await;
    client
        .store()
        .set_credential(Credential::new("A1", "R1"))
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/wallet/balance/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(wallet_body()))
        .mount(&server)
        .await;

    let balance = ApiCall::new({
        let client = client.clone();
        move |()| {
            let client = client.clone();
            async move { client.wallet_balance().await }
        }
    });

    balance.execute(()).await;
    let state = balance.state();
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(state.data.unwrap().gold_balance, "1.2500");
}
