//! Integration tests for the `talabin` CLI binary.
//!
//! Argument parsing and local-state behaviour run without a backend; the
//! session round-trip runs against a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `talabin` binary with env isolation.
///
/// Config and data directories point into `home` so tests never touch the
/// user's real configuration or session.
fn talabin_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("talabin");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("TALABIN_SESSION__FILE", home.join("session.json"))
        .env_remove("TALABIN_BASE_URL")
        .env_remove("TALABIN_TIMEOUT_MS")
        .env_remove("TALABIN_PASSWORD")
        .env_remove("TALABIN_OUTPUT__FORMAT")
        .env_remove("RUST_LOG");
    cmd
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = tempfile::tempdir().unwrap();
    let output = talabin_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn test_help_lists_command_groups() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("login")
            .and(predicate::str::contains("wallet"))
            .and(predicate::str::contains("trade"))
            .and(predicate::str::contains("kyc")),
    );
}

#[test]
fn test_version_flag() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("talabin"));
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_unknown_timeframe_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .args(["price", "history", "--timeframe", "2w"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown timeframe"));
}

#[test]
fn test_unknown_output_format_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .args(["--output", "yaml", "wallet", "balance"])
        .assert()
        .code(2);
}

#[test]
fn test_login_requires_phone() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .args(["login", "--password", "x"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--phone"));
}

#[test]
fn test_malformed_phone_is_usage_error() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .args(["otp", "send", "--phone", "9123456789"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("phone number"));
}

#[test]
fn test_national_id_checksum_is_enforced() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .args([
            "kyc",
            "submit",
            "--national-id",
            "0499370898",
            "--first-name",
            "Sara",
            "--last-name",
            "Ahmadi",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("check digit"));
}

// ── Local state ─────────────────────────────────────────────────────

#[test]
fn test_protected_command_without_session_exits_auth() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .args(["wallet", "balance"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Not signed in"));

    // The guard remembers where the user was headed.
    let session = std::fs::read_to_string(home.path().join("session.json")).unwrap();
    assert!(session.contains("/dashboard/wallet"));
}

#[test]
fn test_logout_without_session_is_noop() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .arg("logout")
        .assert()
        .success()
        .stderr(predicate::str::contains("Not signed in"));
}

#[test]
fn test_config_show_reflects_env() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .env("TALABIN_BASE_URL", "https://api.talabin.ir/api")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("base_url = \"https://api.talabin.ir/api\"")
                .and(predicate::str::contains("[retry]")),
        );
}

#[test]
fn test_config_path_reports_session_file() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("session.json"));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let home = tempfile::tempdir().unwrap();
    let dir = home.path().join("config").join("talabin");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.toml"), "timeout_ms = \"soon\"\n").unwrap();

    talabin_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config"));
}

#[test]
fn test_profile_update_requires_a_field() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .args(["profile", "update"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nothing to update"));
}

#[test]
fn test_kyc_upload_rejects_unknown_kind() {
    let home = tempfile::tempdir().unwrap();
    talabin_cmd(home.path())
        .args(["kyc", "upload", "--kind", "passport", "id.png"])
        .assert()
        .code(2);
}

// ── Session round-trip ──────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_login_then_wallet_balance_uses_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "user": {
                    "id": 5,
                    "phone_number": "09123456789",
                    "full_name": "Sara Ahmadi",
                    "is_verified": true,
                    "verification_status": "verified"
                },
                "tokens": {"access": "A1", "refresh": "R1"}
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wallet/balance/"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"balance_irr": "2500000.00", "gold_balance": "1.2500"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let home_path = home.path().to_owned();
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        talabin_cmd(&home_path)
            .env("TALABIN_BASE_URL", &uri)
            .args(["wallet", "balance"])
            .assert()
            .code(3);

        talabin_cmd(&home_path)
            .env("TALABIN_BASE_URL", &uri)
            .args(["login", "--phone", "09123456789", "--password", "otp123"])
            .assert()
            .success()
            .stderr(
                predicate::str::contains("Sara Ahmadi")
                    .and(predicate::str::contains("talabin wallet balance")),
            );

        talabin_cmd(&home_path)
            .env("TALABIN_BASE_URL", &uri)
            .args(["--output", "json", "wallet", "balance"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"gold_balance\": \"1.2500\""));
    })
    .await
    .unwrap();
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "user": {
                    "id": 5,
                    "phone_number": "09123456789",
                    "full_name": "Sara Ahmadi",
                    "is_verified": true,
                    "verification_status": "verified"
                },
                "tokens": {"access": "A1", "refresh": "R1"}
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_receipt_upload_and_account_removal_run_as_tracked_calls() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/wallet/deposits/7/upload_receipt/"))
        .and(header("authorization", "Bearer A1"))
        .and(body_string_contains("name=\"receipt_image\"; filename=\"receipt.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 7, "status": "pending"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/wallet/bank-accounts/31/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": {"message": "حساب بانکی یافت نشد"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    let receipt = home.path().join("receipt.png");
    std::fs::write(&receipt, b"PNGDATA").unwrap();
    let home_path = home.path().to_owned();
    let uri = server.uri();

    tokio::task::spawn_blocking(move || {
        talabin_cmd(&home_path)
            .env("TALABIN_BASE_URL", &uri)
            .args(["login", "--phone", "09123456789", "--password", "otp123"])
            .assert()
            .success();

        talabin_cmd(&home_path)
            .env("TALABIN_BASE_URL", &uri)
            .env("NO_COLOR", "1")
            .args(["-vv", "--output", "json", "wallet", "upload-receipt", "--deposit", "7"])
            .arg(&receipt)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"status\": \"pending\""))
            .stderr(predicate::str::contains("call settled"));

        talabin_cmd(&home_path)
            .env("TALABIN_BASE_URL", &uri)
            .args(["wallet", "remove-bank-account", "31"])
            .assert()
            .code(4)
            .stderr(predicate::str::contains("حساب بانکی یافت نشد"));
    })
    .await
    .unwrap();
}
