//! End-to-end flows through the REST scope over in-memory adapters.

// Shared harness carries helpers used only by other suites.
#[allow(dead_code)]
mod support;

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use rstest::rstest;
use serde_json::{Value, json};

use stockdesk::domain::AuditStatus;
use stockdesk::domain::ports::PayloadCipher;
use stockdesk::outbound::crypto::AesGcmPayloadCipher;
use support::{ADMIN_EMAIL, ADMIN_PASSWORD, DEVELOPMENT_CODE, Harness, bearer};

fn signup_request(email: &str) -> TestRequest {
    TestRequest::post().uri("/api/v1/auth/signup").set_json(json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": email,
        "password": "Engine!1843",
    }))
}

fn stock_body(symbol: &str) -> Value {
    json!({ "symbol": symbol, "name": "Listed Company", "exchange": "NYSE" })
}

async fn admin_token(harness: &Harness) -> String {
    harness.seed_super_admin().await;
    harness.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await
}

#[actix_web::test]
async fn signup_then_login_reaches_the_profile() {
    let harness = Harness::new();

    let signup = harness.call(signup_request("ada@example.com")).await;
    assert_eq!(signup.status, StatusCode::CREATED);
    assert_eq!(signup.body["message"], json!("Account was created successfully"));

    let login = harness
        .call(TestRequest::post().uri("/api/v1/auth/login").set_json(json!({
            "email": "ADA@example.com",
            "password": "Engine!1843",
        })))
        .await;
    assert_eq!(login.status, StatusCode::OK);
    let token = login.body["data"]["access_token"].as_str().expect("token");

    let me = harness
        .call(bearer(TestRequest::get().uri("/api/v1/account/me"), token))
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["email"], json!("ada@example.com"));
    assert!(me.body["data"].get("password_hash").is_none());
}

#[actix_web::test]
async fn wrong_password_is_a_field_error() {
    let harness = Harness::new();
    harness.seed_super_admin().await;

    let reply = harness
        .call(TestRequest::post().uri("/api/v1/auth/login").set_json(json!({
            "email": ADMIN_EMAIL,
            "password": "not-the-password",
        })))
        .await;

    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.body["errors"]["email"].is_array());
}

#[actix_web::test]
async fn logout_revokes_the_token() {
    let harness = Harness::new();
    let token = admin_token(&harness).await;

    let logout = harness
        .call(bearer(TestRequest::post().uri("/api/v1/auth/logout"), &token))
        .await;
    assert_eq!(logout.status, StatusCode::OK);

    let me = harness
        .call(bearer(TestRequest::get().uri("/api/v1/account/me"), &token))
        .await;
    assert_eq!(me.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn refresh_issues_a_working_token() {
    let harness = Harness::new();
    let token = admin_token(&harness).await;

    let refresh = harness
        .call(bearer(TestRequest::post().uri("/api/v1/auth/token/refresh"), &token))
        .await;
    assert_eq!(refresh.status, StatusCode::OK);
    let renewed = refresh.body["data"]["access_token"]
        .as_str()
        .expect("token")
        .to_owned();

    let me = harness
        .call(bearer(TestRequest::get().uri("/api/v1/account/me"), &renewed))
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["email"], json!(ADMIN_EMAIL));

    harness
        .call(bearer(TestRequest::post().uri("/api/v1/auth/logout"), &renewed))
        .await;
    let after_logout = harness
        .call(bearer(TestRequest::post().uri("/api/v1/auth/token/refresh"), &token))
        .await;
    assert_eq!(after_logout.status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn refresh_needs_a_bearer_token() {
    let harness = Harness::new();

    let reply = harness
        .call(TestRequest::post().uri("/api/v1/auth/token/refresh"))
        .await;

    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body, json!({ "message": "Permission denied" }));
}

#[actix_web::test]
async fn repeated_logins_from_one_address_are_throttled() {
    let harness = Harness::new();
    harness.seed_super_admin().await;
    let login = |password: &str| {
        TestRequest::post()
            .uri("/api/v1/auth/login")
            .peer_addr("192.0.2.10:40000".parse().expect("socket address"))
            .set_json(json!({ "email": ADMIN_EMAIL, "password": password }))
    };

    let mut statuses = Vec::new();
    for _ in 0..5 {
        statuses.push(harness.call(login("not-the-password")).await.status);
    }
    assert!(statuses.iter().all(|status| *status == StatusCode::UNPROCESSABLE_ENTITY));

    let sixth = harness.call(login(ADMIN_PASSWORD)).await;
    assert_eq!(sixth.status, StatusCode::TOO_MANY_REQUESTS);
    assert!(sixth.body["errors"]["non_field_errors"].is_array());

    let elsewhere = harness
        .call(
            TestRequest::post()
                .uri("/api/v1/auth/login")
                .peer_addr("192.0.2.11:40000".parse().expect("socket address"))
                .set_json(json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
        )
        .await;
    assert_eq!(elsewhere.status, StatusCode::OK);
}

#[actix_web::test]
async fn forgot_password_does_not_reveal_accounts() {
    let harness = Harness::new();
    harness.seed_super_admin().await;
    let forgot = |email: &str| {
        TestRequest::post()
            .uri("/api/v1/auth/password/forgot")
            .set_json(json!({ "email": email }))
    };

    let known = harness.call(forgot(ADMIN_EMAIL)).await;
    let unknown = harness.call(forgot("nobody@stockdesk.test")).await;

    assert_eq!(known.status, StatusCode::OK);
    assert_eq!(unknown.status, known.status);
    assert_eq!(unknown.body, known.body);
}

#[actix_web::test]
async fn reset_codes_stop_working_after_repeated_guesses() {
    let harness = Harness::new();
    harness.seed_super_admin().await;
    harness
        .call(
            TestRequest::post()
                .uri("/api/v1/auth/password/forgot")
                .set_json(json!({ "email": ADMIN_EMAIL })),
        )
        .await;
    let reset = |code: &str| {
        TestRequest::post().uri("/api/v1/auth/password/reset").set_json(json!({
            "email": ADMIN_EMAIL,
            "otp": code,
            "password": "Brand!New-Passw0rd",
        }))
    };

    for _ in 0..5 {
        let guess = harness.call(reset("000000")).await;
        assert_eq!(guess.status, StatusCode::BAD_REQUEST);
    }
    let genuine = harness.call(reset(DEVELOPMENT_CODE)).await;

    assert_eq!(genuine.status, StatusCode::BAD_REQUEST);
    assert_eq!(genuine.body, json!({ "message": "Invalid or expired OTP" }));
}

#[actix_web::test]
async fn signup_code_verifies_the_email() {
    let harness = Harness::new();
    harness.call(signup_request("ada@example.com")).await;

    let resend = harness
        .call(
            TestRequest::post()
                .uri("/api/v1/auth/signup/resend-otp")
                .set_json(json!({ "email": "ada@example.com" })),
        )
        .await;
    assert_eq!(resend.status, StatusCode::OK);

    let verify = harness
        .call(
            TestRequest::post()
                .uri("/api/v1/auth/signup/verify-otp")
                .set_json(json!({ "email": "ada@example.com", "otp": DEVELOPMENT_CODE })),
        )
        .await;
    assert_eq!(verify.status, StatusCode::OK);
    assert_eq!(verify.body["message"], json!("Email verified successfully"));

    let token = harness.token_for("ada@example.com", "Engine!1843").await;
    let me = harness
        .call(bearer(TestRequest::get().uri("/api/v1/account/me"), &token))
        .await;
    assert_eq!(me.body["data"]["email_verified"], json!(true));
}

#[actix_web::test]
async fn password_reset_replaces_the_credentials() {
    let harness = Harness::new();
    harness.seed_super_admin().await;

    let forgot = harness
        .call(
            TestRequest::post()
                .uri("/api/v1/auth/password/forgot")
                .set_json(json!({ "email": ADMIN_EMAIL })),
        )
        .await;
    assert_eq!(forgot.status, StatusCode::OK);

    let reset = harness
        .call(TestRequest::post().uri("/api/v1/auth/password/reset").set_json(json!({
            "email": ADMIN_EMAIL,
            "otp": DEVELOPMENT_CODE,
            "password": "Fresh!Passw0rd42",
        })))
        .await;
    assert_eq!(reset.status, StatusCode::OK);

    let login = harness
        .call(TestRequest::post().uri("/api/v1/auth/login").set_json(json!({
            "email": ADMIN_EMAIL,
            "password": "Fresh!Passw0rd42",
        })))
        .await;
    assert_eq!(login.status, StatusCode::OK);
}

#[rstest]
#[case(json!({}), &["first_name", "last_name", "email", "password"])]
#[case(
    json!({ "first_name": "Ada", "last_name": "Lovelace", "email": "nope" }),
    &["email", "password"]
)]
#[actix_web::test]
async fn signup_reports_every_invalid_field(#[case] body: Value, #[case] fields: &[&str]) {
    let harness = Harness::new();

    let reply = harness
        .call(TestRequest::post().uri("/api/v1/auth/signup").set_json(body))
        .await;

    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    let errors = reply.body["errors"].as_object().expect("errors object");
    for field in fields {
        assert!(errors.contains_key(*field), "missing error for {field}");
    }
}

#[actix_web::test]
async fn malformed_json_is_a_validation_failure() {
    let harness = Harness::new();

    let reply = harness
        .call(
            TestRequest::post()
                .uri("/api/v1/auth/login")
                .insert_header(("content-type", "application/json"))
                .set_payload("{not json"),
        )
        .await;

    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.body["errors"]["non_field_errors"].is_array());
}

#[rstest]
#[case("/api/v1/stocks/abc")]
#[case("/api/v1/account/users/-1")]
#[actix_web::test]
async fn malformed_identifiers_read_as_missing(#[case] uri: &str) {
    let harness = Harness::new();
    let token = admin_token(&harness).await;

    let reply = harness.call(bearer(TestRequest::get().uri(uri), &token)).await;

    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(reply.body, json!({ "message": "Not found" }));
}

#[actix_web::test]
async fn stock_list_is_paginated() {
    let harness = Harness::new();
    let token = admin_token(&harness).await;
    for symbol in ["AAA", "BBB", "CCC"] {
        let created = harness
            .call(bearer(
                TestRequest::post().uri("/api/v1/stocks").set_json(stock_body(symbol)),
                &token,
            ))
            .await;
        assert_eq!(created.status, StatusCode::CREATED);
    }

    let reply = harness
        .call(bearer(
            TestRequest::get().uri("/api/v1/stocks?page=2&page_size=2"),
            &token,
        ))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["total"], json!(3));
    assert_eq!(reply.body["current_page"], json!(2));
    assert_eq!(reply.body["last_page"], json!(2));
    assert_eq!(reply.body["data"].as_array().map(Vec::len), Some(1));
    assert!(reply.body["next_page_url"].is_null());
    assert!(reply.body["prev_page_url"].is_string());
}

#[actix_web::test]
async fn stock_lifecycle_with_subscription_and_alert() {
    let harness = Harness::new();
    let token = admin_token(&harness).await;

    let stock = harness
        .call(bearer(
            TestRequest::post().uri("/api/v1/stocks").set_json(stock_body("ibm")),
            &token,
        ))
        .await;
    assert_eq!(stock.status, StatusCode::CREATED);
    assert_eq!(stock.body["data"]["symbol"], json!("IBM"));
    let stock_id = stock.body["data"]["id"].as_u64().expect("stock id");

    let subscription = harness
        .call(bearer(
            TestRequest::post()
                .uri("/api/v1/stocks/subscriptions")
                .set_json(json!({ "symbol": "IBM", "frequency": 60 })),
            &token,
        ))
        .await;
    assert_eq!(subscription.status, StatusCode::CREATED);

    let alert = harness
        .call(bearer(
            TestRequest::post()
                .uri("/api/v1/stocks/alerts")
                .set_json(json!({ "symbol": "IBM", "threshold_price": "141.50" })),
            &token,
        ))
        .await;
    assert_eq!(alert.status, StatusCode::CREATED);
    let alert_id = alert.body["data"]["id"].as_u64().expect("alert id");

    let removed = harness
        .call(bearer(
            TestRequest::delete().uri(&format!("/api/v1/stocks/alerts/{alert_id}")),
            &token,
        ))
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["message"], json!("Alert deleted successfully"));

    let deleted = harness
        .call(bearer(
            TestRequest::delete().uri(&format!("/api/v1/stocks/{stock_id}")),
            &token,
        ))
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let gone = harness
        .call(bearer(
            TestRequest::get().uri(&format!("/api/v1/stocks/{stock_id}")),
            &token,
        ))
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn encrypted_bodies_round_trip() {
    let cipher = Arc::new(AesGcmPayloadCipher::new(&[7_u8; 32]));
    let harness = Harness::with_cipher(Some(cipher.clone()));
    harness.seed_super_admin().await;

    let credentials = json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD });
    let sealed = cipher.encrypt_nested(&credentials).expect("seal request");
    let reply = harness
        .call(TestRequest::post().uri("/api/v1/auth/login").set_json(sealed))
        .await;

    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body["data"]["email"].is_string());
    assert_ne!(reply.body["data"]["email"], json!(ADMIN_EMAIL));
    let opened = cipher.decrypt_nested(&reply.body).expect("open response");
    assert_eq!(opened["data"]["email"], json!(ADMIN_EMAIL));
}

#[actix_web::test]
async fn error_bodies_stay_in_plain_text_when_encrypting() {
    let cipher = Arc::new(AesGcmPayloadCipher::new(&[7_u8; 32]));
    let harness = Harness::with_cipher(Some(cipher));

    let reply = harness.call(TestRequest::get().uri("/api/v1/stocks")).await;

    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.body, json!({ "message": "Permission denied" }));
}

#[actix_web::test]
async fn audited_calls_are_recorded_and_completed() {
    let mut harness = Harness::new();
    harness.start_audit_worker();
    let token = admin_token(&harness).await;

    harness
        .call(bearer(
            TestRequest::post().uri("/api/v1/stocks").set_json(stock_body("ORCL")),
            &token,
        ))
        .await;
    harness
        .call(bearer(TestRequest::get().uri("/api/v1/stocks"), &token))
        .await;
    harness.call(TestRequest::get().uri("/api/v1/stocks")).await;

    let entries = harness.settled_audit(1).await;
    assert_eq!(entries.len(), 1, "reads and denials are not audited");
    let entry = &entries[0];
    assert_eq!(entry.request.method, "POST");
    assert_eq!(entry.request.endpoint, "/api/v1/stocks");
    assert_eq!(entry.status, AuditStatus::Success);
    assert!(!entry.request.headers.contains_key("authorization"));
    assert!(
        entry
            .response_body
            .as_deref()
            .is_some_and(|body| body.contains("ORCL"))
    );
}
