#![allow(clippy::unwrap_used)]
// Profile, bank-account and upload operations against wiremock.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use talabin_api::models::{BankAccountUpdate, NewBankAccount, PasswordChange, ProfileUpdate};
use talabin_api::{ClientConfig, FileUpload, RetryPolicy};
use talabin_core::{Credential, MemoryStorage, TalabinClient};

async fn signed_in() -> (MockServer, TalabinClient) {
    let server = MockServer::start().await;
    let config = ClientConfig::new(&server.uri())
        .unwrap()
        .with_retry(RetryPolicy::disabled());
    let client = TalabinClient::new(config, Arc::new(MemoryStorage::new())).unwrap();
    client
        .store()
        .set_credential(Credential::new("A1", "R1"))
        .unwrap();
    (server, client)
}

fn account_body(id: u64, default: bool) -> serde_json::Value {
    json!({
        "success": true,
        "data": {
            "id": id,
            "bank_name": "Mellat",
            "sheba_number": "IR820540102680020817909002",
            "account_holder_name": "Sara Ahmadi",
            "is_verified": false,
            "is_default": default
        }
    })
}

// ── Profile ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_profile_sends_only_set_fields_and_caches_user() {
    let (server, client) = signed_in().await;

    Mock::given(method("PUT"))
        .and(path("/auth/profile/update/"))
        .and(header("authorization", "Bearer A1"))
        .and(body_json(json!({"first_name": "Sara", "email": "sara@example.ir"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "id": 12,
                "phone_number": "09123456789",
                "first_name": "Sara",
                "full_name": "Sara Ahmadi",
                "email": "sara@example.ir"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let update = ProfileUpdate {
        first_name: Some("Sara"),
        email: Some("sara@example.ir"),
        ..ProfileUpdate::default()
    };
    let user = client.update_profile(&update).await.into_result().unwrap();

    assert_eq!(user.email.as_deref(), Some("sara@example.ir"));
    assert_eq!(client.store().identity(), Some(user));
}

#[tokio::test]
async fn test_change_password_posts_all_three_fields() {
    let (server, client) = signed_in().await;

    Mock::given(method("POST"))
        .and(path("/auth/profile/change-password/"))
        .and(body_json(json!({
            "old_password": "old-secret",
            "new_password": "new-secret",
            "new_password_confirm": "new-secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "رمز عبور تغییر کرد"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client
        .change_password(&PasswordChange {
            old_password: "old-secret",
            new_password: "new-secret",
            new_password_confirm: "new-secret",
        })
        .await;

    assert!(envelope.is_success());
    assert_eq!(envelope.message(), Some("رمز عبور تغییر کرد"));
}

// ── Bank accounts ───────────────────────────────────────────────────

#[tokio::test]
async fn test_bank_account_lifecycle_uses_id_paths() {
    let (server, client) = signed_in().await;

    Mock::given(method("POST"))
        .and(path("/wallet/bank-accounts/"))
        .and(body_json(json!({
            "bank_name": "Mellat",
            "sheba_number": "IR820540102680020817909002",
            "account_holder_name": "Sara Ahmadi",
            "is_default": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(account_body(31, false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/wallet/bank-accounts/31/"))
        .and(body_json(json!({"is_default": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_body(31, true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/wallet/bank-accounts/31/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let added = client
        .add_bank_account(&NewBankAccount {
            bank_name: "Mellat",
            sheba_number: "IR820540102680020817909002",
            account_number: None,
            card_number: None,
            account_holder_name: Some("Sara Ahmadi"),
            is_default: false,
        })
        .await
        .into_result()
        .unwrap();
    assert_eq!(added.id, 31);

    let updated = client
        .update_bank_account(
            31,
            &BankAccountUpdate {
                is_default: Some(true),
                ..BankAccountUpdate::default()
            },
        )
        .await
        .into_result()
        .unwrap();
    assert!(updated.is_default);

    assert!(client.delete_bank_account(31).await.is_success());
}

// ── Uploads ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_deposit_receipt_is_uploaded_as_receipt_image() {
    let (server, client) = signed_in().await;

    Mock::given(method("POST"))
        .and(path("/wallet/deposits/7/upload_receipt/"))
        .and(header("authorization", "Bearer A1"))
        .and(header_regex("content-type", "^multipart/form-data"))
        .and(body_string_contains("name=\"receipt_image\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 7, "status": "pending"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = FileUpload::new("receipt.jpg", b"JPEG".to_vec());
    let data = client
        .upload_deposit_receipt(7, receipt)
        .await
        .into_result()
        .unwrap();
    assert_eq!(data["status"], "pending");
}

#[tokio::test]
async fn test_selfie_upload_is_replayed_after_refresh() {
    let (server, client) = signed_in().await;

    Mock::given(method("POST"))
        .and(path("/kyc/upload-selfie/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "A2"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/kyc/upload-selfie/"))
        .and(header("authorization", "Bearer A2"))
        .and(body_string_contains("filename=\"me.png\""))
        .and(body_string_contains("SELFIE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client
        .upload_selfie(FileUpload::new("me.png", b"SELFIE".to_vec()))
        .await;

    assert!(envelope.is_success());
    let credential = client.store().credential().unwrap();
    assert_eq!(credential.access_token().expose_secret(), "A2");
}
