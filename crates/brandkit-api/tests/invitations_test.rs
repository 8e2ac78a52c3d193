//! Invitation lifecycle integration tests.
//!
//! Run with: `cargo test -p brandkit-api --test invitations_test`

mod helpers;

use brandkit_core::models::{Client, NewInvitation, UserRole};
use chrono::{Duration, Utc};
use helpers::{setup_test_app, TestApp, TestUser};
use serde_json::{json, Value};
use std::future::IntoFuture;

async fn seed_invitation(
    app: &TestApp,
    inviter: &TestUser,
    client: &Client,
    email: &str,
    token: &str,
    expires_in: Duration,
) {
    app.repos()
        .invitations
        .create(NewInvitation {
            email: email.to_string(),
            role: UserRole::Standard,
            client_ids: vec![client.id],
            token: token.to_string(),
            created_by: inviter.user.id,
            expires_at: Utc::now() + expires_in,
        })
        .await
        .expect("Failed to create invitation");
}

#[tokio::test]
async fn test_admin_creates_invitation() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let admin = app.create_user("admin@acme.test", UserRole::Admin).await;
    app.add_member(&client, &admin).await;

    let response = app
        .client()
        .post("/api/invitations")
        .add_header("Authorization", admin.bearer())
        .json(&json!({
            "email": "new@acme.test",
            "role": "editor",
            "client_ids": [client.id],
        }))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["invitation"]["email"], "new@acme.test");
    assert_eq!(body["invitation"]["status"], "pending");
    assert!(body["invitation"].get("token").is_none());
    assert!(body["accept_url"].as_str().unwrap().contains("/signup?token="));
    assert_eq!(body["email_sent"], true);
}

#[tokio::test]
async fn test_invitation_for_existing_user_conflicts() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let admin = app.create_user("admin@acme.test", UserRole::Admin).await;
    app.create_user("taken@acme.test", UserRole::Standard).await;
    app.add_member(&client, &admin).await;

    let response = app
        .client()
        .post("/api/invitations")
        .add_header("Authorization", admin.bearer())
        .json(&json!({
            "email": "taken@acme.test",
            "role": "standard",
            "client_ids": [client.id],
        }))
        .await;

    assert_eq!(response.status_code(), 409);
}

#[tokio::test]
async fn test_editor_cannot_invite() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let editor = app.create_user("editor@acme.test", UserRole::Editor).await;
    app.add_member(&client, &editor).await;

    let response = app
        .client()
        .post("/api/invitations")
        .add_header("Authorization", editor.bearer())
        .json(&json!({
            "email": "new@acme.test",
            "role": "guest",
            "client_ids": [client.id],
        }))
        .await;

    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_accept_invitation_creates_member() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let admin = app.create_user("admin@acme.test", UserRole::Admin).await;
    seed_invitation(&app, &admin, &client, "grace@acme.test", "invite-token", Duration::days(7)).await;
    app.register_identity("id-token-grace", "firebase-grace", "grace@acme.test");

    let response = app.client().get("/api/invitations/invite-token").await;
    assert_eq!(response.status_code(), 200);
    let details: Value = response.json();
    assert_eq!(details["email"], "grace@acme.test");
    assert_eq!(details["client_names"], json!(["Acme"]));

    let response = app
        .client()
        .post("/api/invitations/invite-token/accept")
        .json(&json!({ "id_token": "id-token-grace", "name": "Grace" }))
        .await;
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["user"]["email"], "grace@acme.test");
    assert_eq!(body["user"]["role"], "standard");
    assert_eq!(body["user"]["client_ids"], json!([client.id]));

    // Single use
    let response = app.client().get("/api/invitations/invite-token").await;
    assert_eq!(response.status_code(), 410);
}

#[tokio::test]
async fn test_concurrent_accepts_consume_invitation_once() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let admin = app.create_user("admin@acme.test", UserRole::Admin).await;
    seed_invitation(&app, &admin, &client, "grace@acme.test", "race-token", Duration::days(7)).await;
    app.register_identity("id-token-laptop", "firebase-laptop", "grace@acme.test");
    app.register_identity("id-token-phone", "firebase-phone", "grace@acme.test");

    let first = app
        .client()
        .post("/api/invitations/race-token/accept")
        .json(&json!({ "id_token": "id-token-laptop" }));
    let second = app
        .client()
        .post("/api/invitations/race-token/accept")
        .json(&json!({ "id_token": "id-token-phone" }));
    let (first, second) = tokio::join!(first.into_future(), second.into_future());

    let mut statuses = vec![first.status_code().as_u16(), second.status_code().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![201, 410]);

    let winner = if first.status_code() == 201 { "firebase-laptop" } else { "firebase-phone" };
    let user = app
        .repos()
        .users
        .get_by_email("grace@acme.test")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.firebase_uid.as_deref(), Some(winner));
    assert_eq!(
        app.repos().clients.client_ids_for_user(user.id).await.unwrap(),
        vec![client.id]
    );
}

#[tokio::test]
async fn test_accept_requires_verified_email() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let admin = app.create_user("admin@acme.test", UserRole::Admin).await;
    seed_invitation(&app, &admin, &client, "grace@acme.test", "tok", Duration::days(7)).await;
    app.register_unverified_identity("id-token-grace", "firebase-grace", "grace@acme.test");

    let response = app
        .client()
        .post("/api/invitations/tok/accept")
        .json(&json!({ "id_token": "id-token-grace" }))
        .await;
    assert_eq!(response.status_code(), 403);

    // Still usable by the verified owner
    let response = app.client().get("/api/invitations/tok").await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_invitation_email_is_normalized() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let admin = app.create_user("admin@acme.test", UserRole::Admin).await;
    app.add_member(&client, &admin).await;

    let response = app
        .client()
        .post("/api/invitations")
        .add_header("Authorization", admin.bearer())
        .json(&json!({
            "email": "New.Person@ACME.test",
            "role": "guest",
            "client_ids": [client.id],
        }))
        .await;
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["invitation"]["email"], "new.person@acme.test");
}

#[tokio::test]
async fn test_expired_invitation_is_gone() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let admin = app.create_user("admin@acme.test", UserRole::Admin).await;
    seed_invitation(&app, &admin, &client, "late@acme.test", "old-token", Duration::days(-1)).await;
    app.register_identity("id-token-late", "firebase-late", "late@acme.test");

    let response = app.client().get("/api/invitations/old-token").await;
    assert_eq!(response.status_code(), 410);

    let response = app
        .client()
        .post("/api/invitations/old-token/accept")
        .json(&json!({ "id_token": "id-token-late" }))
        .await;
    assert_eq!(response.status_code(), 410);
}

#[tokio::test]
async fn test_accept_with_different_email_is_forbidden() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let admin = app.create_user("admin@acme.test", UserRole::Admin).await;
    seed_invitation(&app, &admin, &client, "intended@acme.test", "tok", Duration::days(7)).await;
    app.register_identity("id-token-other", "firebase-other", "someone-else@acme.test");

    let response = app
        .client()
        .post("/api/invitations/tok/accept")
        .json(&json!({ "id_token": "id-token-other" }))
        .await;

    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_unknown_invitation_is_not_found() {
    let app = setup_test_app().await;

    let response = app.client().get("/api/invitations/missing").await;
    assert_eq!(response.status_code(), 404);
}
