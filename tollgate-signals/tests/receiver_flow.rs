//! End-to-end receiver flows: bearer authorization, SET verification, event
//! dispatch, and the consequences applied to the user directory.

mod common;

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use common::{
    ReceiverHarness, account_purged_claims, credential_change_claims, email_update_claims,
    forge_set, sign_set, sign_set_with_kid, sign_set_with_typ, start_disabled_receiver,
    start_receiver, start_receiver_against, valid_bearer,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tollgate_signals::directory::{DirectoryUser, UserDirectory};
use tollgate_signals::error::{Error, Result};
use tollgate_signals::events::CREDENTIAL_CHANGE_INFORMATION;

fn bearer_header(value: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(value).expect("header is ASCII"),
    )
}

async fn deliver(harness: &ReceiverHarness, token: &str) -> axum_test::TestResponse {
    let (name, value) = bearer_header(&valid_bearer(&harness.jwks));
    harness
        .server
        .post("/receiver")
        .add_header(name, value)
        .text(token.to_string())
        .content_type("application/secevent+jwt")
        .await
}

fn signed_in_user() -> DirectoryUser {
    DirectoryUser {
        email: Some("old@example.com".into()),
        signed_in: true,
    }
}

#[tokio::test]
async fn password_update_revokes_sessions() {
    let harness = start_receiver().await;
    harness.directory.insert("user-1", signed_in_user()).await;

    let token = sign_set(&credential_change_claims("update", Some("password"), "user-1"));
    let response = deliver(&harness, &token).await;

    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Accepted");

    let user = harness.directory.get("user-1").await.unwrap();
    assert!(!user.signed_in);
    assert_eq!(user.email.as_deref(), Some("old@example.com"));
}

#[tokio::test]
async fn email_update_rewrites_the_address_and_revokes_sessions() {
    let harness = start_receiver().await;
    harness.directory.insert("user-1", signed_in_user()).await;

    let token = sign_set(&email_update_claims("user-1", "new@example.com"));
    let response = deliver(&harness, &token).await;

    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let user = harness.directory.get("user-1").await.unwrap();
    assert!(!user.signed_in);
    assert_eq!(user.email.as_deref(), Some("new@example.com"));
}

#[tokio::test]
async fn email_update_without_an_address_is_rejected() {
    let harness = start_receiver().await;
    harness.directory.insert("user-1", signed_in_user()).await;

    // No eventInformation at all, then information without an email.
    let bare = credential_change_claims("update", Some("email"), "user-1");
    let mut empty_info = bare.clone();
    empty_info["events"][CREDENTIAL_CHANGE_INFORMATION] = json!({});

    for claims in [bare, empty_info] {
        let response = deliver(&harness, &sign_set(&claims)).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "Bad Request");
    }

    let user = harness.directory.get("user-1").await.unwrap();
    assert!(user.signed_in);
    assert_eq!(user.email.as_deref(), Some("old@example.com"));
}

#[tokio::test]
async fn non_update_changes_are_rejected() {
    let harness = start_receiver().await;
    harness.directory.insert("user-1", signed_in_user()).await;

    for change_type in ["delete", "create", "revoke"] {
        let claims = credential_change_claims(change_type, Some("password"), "user-1");
        let response = deliver(&harness, &sign_set(&claims)).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{change_type}");
    }
    let claims = credential_change_claims("update", None, "user-1");
    let response = deliver(&harness, &sign_set(&claims)).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    assert!(harness.directory.get("user-1").await.unwrap().signed_in);
}

#[tokio::test]
async fn events_for_unknown_subjects_are_acknowledged() {
    let harness = start_receiver().await;

    let tokens = [
        sign_set(&credential_change_claims("update", Some("password"), "ghost")),
        sign_set(&email_update_claims("ghost", "new@example.com")),
        sign_set(&account_purged_claims("ghost")),
    ];
    for token in tokens {
        let response = deliver(&harness, &token).await;
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    }
    assert!(harness.directory.get("ghost").await.is_none());
}

#[tokio::test]
async fn account_purge_removes_the_user() {
    let harness = start_receiver().await;
    harness.directory.insert("user-1", signed_in_user()).await;

    let response = deliver(&harness, &sign_set(&account_purged_claims("user-1"))).await;

    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    assert!(harness.directory.get("user-1").await.is_none());
}

#[tokio::test]
async fn deliveries_without_a_valid_bearer_are_unauthorized() {
    let harness = start_receiver().await;
    harness.directory.insert("user-1", signed_in_user()).await;
    let token = sign_set(&credential_change_claims("update", Some("password"), "user-1"));

    let response = harness.server.post("/receiver").text(token.clone()).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["message"], "Unauthorized");

    for authorization in ["Basic dXNlcjpwYXNz", "Bearer not.a.jwt"] {
        let (name, value) = bearer_header(authorization);
        let response = harness
            .server
            .post("/receiver")
            .add_header(name, value)
            .text(token.clone())
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED, "{authorization}");
    }

    assert!(harness.directory.get("user-1").await.unwrap().signed_in);
}

#[tokio::test]
async fn disabled_receiver_refuses_deliveries() {
    let harness = start_disabled_receiver().await;

    let token = sign_set(&credential_change_claims("update", Some("password"), "user-1"));
    let response = deliver(&harness, &token).await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert_eq!(body["message"], "Service Unavailable");
}

#[tokio::test]
async fn forged_or_mistyped_tokens_are_rejected() {
    let harness = start_receiver().await;
    harness.directory.insert("user-1", signed_in_user()).await;
    let claims = credential_change_claims("update", Some("password"), "user-1");

    let tokens = [
        forge_set(&claims),
        sign_set_with_typ(&claims, "JWT"),
        sign_set_with_kid(&claims, "unknown-key"),
    ];
    for token in tokens {
        let response = deliver(&harness, &token).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    assert!(harness.directory.get("user-1").await.unwrap().signed_in);
}

#[tokio::test]
async fn tokens_from_other_transmitters_are_rejected() {
    let harness = start_receiver().await;
    harness.directory.insert("user-1", signed_in_user()).await;

    let mut wrong_issuer = credential_change_claims("update", Some("password"), "user-1");
    wrong_issuer["iss"] = json!("https://impostor.example.com");
    let mut wrong_audience = credential_change_claims("update", Some("password"), "user-1");
    wrong_audience["aud"] = json!("https://other-receiver.example.com");

    for claims in [wrong_issuer, wrong_audience] {
        let response = deliver(&harness, &sign_set(&claims)).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    assert!(harness.directory.get("user-1").await.unwrap().signed_in);
}

#[tokio::test]
async fn unrecognized_payloads_are_rejected() {
    let harness = start_receiver().await;

    // Unknown event key, then a claim outside the SET profile.
    let mut unknown_event = credential_change_claims("update", Some("password"), "user-1");
    unknown_event["events"] = json!({ "https://schemas.example.com/other-event": {} });
    let mut extra_claim = credential_change_claims("update", Some("password"), "user-1");
    extra_claim["txn"] = json!("tx-1");

    let bodies = [
        String::new(),
        "   ".to_string(),
        "not-a-jwt".to_string(),
        sign_set(&unknown_event),
        sign_set(&extra_claim),
    ];
    for body in bodies {
        let response = deliver(&harness, &body).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{body:?}");
        let json: Value = response.json();
        assert_eq!(json["message"], "Bad Request");
    }
}

#[tokio::test]
async fn directory_failures_surface_as_server_errors() {
    struct FailingDirectory;

    #[async_trait]
    impl UserDirectory for FailingDirectory {
        async fn exists(&self, _user_id: &str) -> Result<bool> {
            Ok(true)
        }
        async fn sign_out(&self, _user_id: &str) -> Result<()> {
            Err(Error::Directory("directory offline".into()))
        }
        async fn update_email(&self, _user_id: &str, _email: &str) -> Result<()> {
            Err(Error::Directory("directory offline".into()))
        }
        async fn delete(&self, _user_id: &str) -> Result<()> {
            Err(Error::Directory("directory offline".into()))
        }
    }

    let (server, jwks) = start_receiver_against(Arc::new(FailingDirectory), true).await;
    let (name, value) = bearer_header(&valid_bearer(&jwks));
    let token = sign_set(&credential_change_claims("update", Some("password"), "user-1"));

    let response = server
        .post("/receiver")
        .add_header(name, value)
        .text(token)
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["message"], "Internal Server Error");
}
