//! Asset API integration tests: client scoping, visibility and role checks.
//!
//! Run with: `cargo test -p brandkit-api --test assets_test`

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use brandkit_core::models::{UserRole, Visibility};
use helpers::setup_test_app;
use serde_json::{json, Value};

#[tokio::test]
async fn test_asset_file_requires_client_id() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let user = app.create_user("editor@acme.test", UserRole::Editor).await;
    app.add_member(&client, &user).await;
    let asset = app.create_logo(&client, &user, Visibility::Shared).await;

    let response = app
        .client()
        .get(&format!("/api/assets/{}/file", asset.id))
        .add_header("Authorization", user.bearer())
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("clientId"));
    assert_eq!(body["recoverable"], json!(false));
    assert!(body["code"].is_string());
}

#[tokio::test]
async fn test_asset_file_rejects_mismatched_client_id() {
    let app = setup_test_app().await;
    let acme = app.create_client("Acme", None).await;
    let globex = app.create_client("Globex", None).await;
    let user = app.create_user("admin@acme.test", UserRole::Admin).await;
    app.add_member(&acme, &user).await;
    app.add_member(&globex, &user).await;
    let asset = app.create_logo(&acme, &user, Visibility::Shared).await;

    let response = app
        .client()
        .get(&format!("/api/assets/{}/file?clientId={}", asset.id, globex.id))
        .add_header("Authorization", user.bearer())
        .await;

    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_asset_file_served_with_matching_client_id() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let user = app.create_user("member@acme.test", UserRole::Standard).await;
    app.add_member(&client, &user).await;
    let asset = app.create_logo(&client, &user, Visibility::Shared).await;

    let response = app
        .client()
        .get(&format!("/api/assets/{}/file?clientId={}", asset.id, client.id))
        .add_header("Authorization", user.bearer())
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "image/png");
    assert_eq!(
        response.as_bytes().to_vec(),
        helpers::fixtures::create_minimal_png()
    );
}

#[tokio::test]
async fn test_private_asset_hidden_from_other_members() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let owner = app.create_user("owner@acme.test", UserRole::Standard).await;
    let guest = app.create_user("guest@acme.test", UserRole::Guest).await;
    app.add_member(&client, &owner).await;
    app.add_member(&client, &guest).await;
    let private = app.create_logo(&client, &owner, Visibility::Private).await;
    let shared = app.create_logo(&client, &owner, Visibility::Shared).await;

    let response = app
        .client()
        .get(&format!("/api/clients/{}/assets", client.id))
        .add_header("Authorization", guest.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    let assets: Vec<Value> = response.json();
    let ids: Vec<&str> = assets.iter().filter_map(|a| a["id"].as_str()).collect();
    assert!(ids.contains(&shared.id.to_string().as_str()));
    assert!(!ids.contains(&private.id.to_string().as_str()));

    let response = app
        .client()
        .get(&format!("/api/assets/{}?clientId={}", private.id, client.id))
        .add_header("Authorization", guest.bearer())
        .await;
    assert_eq!(response.status_code(), 403);

    let response = app
        .client()
        .get(&format!("/api/assets/{}?clientId={}", private.id, client.id))
        .add_header("Authorization", owner.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_non_member_cannot_list_client_assets() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let outsider = app.create_user("outsider@other.test", UserRole::Admin).await;

    let response = app
        .client()
        .get(&format!("/api/clients/{}/assets", client.id))
        .add_header("Authorization", outsider.bearer())
        .await;

    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_guest_cannot_create_public_link() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let owner = app.create_user("owner@acme.test", UserRole::Editor).await;
    let guest = app.create_user("guest@acme.test", UserRole::Guest).await;
    app.add_member(&client, &owner).await;
    app.add_member(&client, &guest).await;
    let asset = app.create_logo(&client, &owner, Visibility::Shared).await;

    let response = app
        .client()
        .post(&format!("/api/assets/{}/public-links?clientId={}", asset.id, client.id))
        .add_header("Authorization", guest.bearer())
        .json(&json!({}))
        .await;

    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_public_link_serves_file_without_session() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let owner = app.create_user("owner@acme.test", UserRole::Editor).await;
    app.add_member(&client, &owner).await;
    let asset = app.create_logo(&client, &owner, Visibility::Shared).await;

    let response = app
        .client()
        .post(&format!("/api/assets/{}/public-links?clientId={}", asset.id, client.id))
        .add_header("Authorization", owner.bearer())
        .json(&json!({ "expires_in_hours": 24 }))
        .await;
    assert_eq!(response.status_code(), 201);
    let link: Value = response.json();
    let token = link["token"].as_str().unwrap().to_string();
    assert!(link["url"].as_str().unwrap().ends_with(&format!("/api/public/{}", token)));

    let response = app.client().get(&format!("/api/public/{}", token)).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "image/png");

    let response = app.client().get("/api/public/not-a-real-token").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_uploaded_html_is_never_rendered_inline() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let editor = app.create_user("editor@acme.test", UserRole::Editor).await;
    app.add_member(&client, &editor).await;

    let part = Part::bytes(b"<script>document.cookie</script>".to_vec())
        .file_name("brief.html")
        .mime_type("text/html");
    let response = app
        .client()
        .post(&format!("/api/clients/{}/assets", client.id))
        .add_header("Authorization", editor.bearer())
        .multipart(MultipartForm::new().add_part("file", part))
        .await;
    assert_eq!(response.status_code(), 201);
    let asset: Value = response.json();
    let id = asset["id"].as_str().unwrap();

    let response = app
        .client()
        .post(&format!("/api/assets/{}/public-links?clientId={}", id, client.id))
        .add_header("Authorization", editor.bearer())
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), 201);
    let link: Value = response.json();
    let token = link["token"].as_str().unwrap();

    let response = app.client().get(&format!("/api/public/{}", token)).await;
    assert_eq!(response.status_code(), 200);
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .starts_with("attachment;"));
    assert_eq!(
        response.header("content-security-policy"),
        "default-src 'none'; sandbox"
    );

    let response = app
        .client()
        .get(&format!("/api/assets/{}/file?clientId={}", id, client.id))
        .add_header("Authorization", editor.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    assert!(response
        .header("content-disposition")
        .to_str()
        .unwrap()
        .starts_with("attachment;"));
}

#[tokio::test]
async fn test_create_color_derives_color_spaces() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let editor = app.create_user("editor@acme.test", UserRole::Editor).await;
    app.add_member(&client, &editor).await;

    let response = app
        .client()
        .post(&format!("/api/clients/{}/colors", client.id))
        .add_header("Authorization", editor.bearer())
        .json(&json!({ "name": "Brand Red", "hex": "ff0000" }))
        .await;

    assert_eq!(response.status_code(), 201);
    let asset: Value = response.json();
    assert_eq!(asset["category"], "color");
    assert_eq!(asset["data"]["hex"], "#FF0000");
    assert_eq!(asset["data"]["rgb"]["r"], 255);
    assert!(asset["file_url"].is_null());

    let response = app
        .client()
        .post(&format!("/api/clients/{}/colors", client.id))
        .add_header("Authorization", editor.bearer())
        .json(&json!({ "name": "Broken", "hex": "not-a-color" }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_upload_logo_and_delete() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let user = app.create_user("member@acme.test", UserRole::Standard).await;
    app.add_member(&client, &user).await;

    let part = Part::bytes(helpers::fixtures::create_minimal_png())
        .file_name("primary-logo.png")
        .mime_type("image/png");
    let form = MultipartForm::new()
        .add_part("file", part)
        .add_text("visibility", "private");

    let response = app
        .client()
        .post(&format!("/api/clients/{}/assets", client.id))
        .add_header("Authorization", user.bearer())
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 201);
    let asset: Value = response.json();
    assert_eq!(asset["name"], "primary-logo");
    assert_eq!(asset["category"], "logo");
    assert_eq!(asset["visibility"], "private");
    let file_url = asset["file_url"].as_str().unwrap();
    assert!(file_url.contains(&format!("clientId={}", client.id)));

    let id = asset["id"].as_str().unwrap();
    let response = app
        .client()
        .delete(&format!("/api/assets/{}?clientId={}", id, client.id))
        .add_header("Authorization", user.bearer())
        .await;
    assert_eq!(response.status_code(), 204);

    let response = app
        .client()
        .get(&format!("/api/assets/{}?clientId={}", id, client.id))
        .add_header("Authorization", user.bearer())
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_guest_cannot_upload() {
    let app = setup_test_app().await;
    let client = app.create_client("Acme", None).await;
    let guest = app.create_user("guest@acme.test", UserRole::Guest).await;
    app.add_member(&client, &guest).await;

    let part = Part::bytes(helpers::fixtures::create_minimal_png())
        .file_name("logo.png")
        .mime_type("image/png");
    let response = app
        .client()
        .post(&format!("/api/clients/{}/assets", client.id))
        .add_header("Authorization", guest.bearer())
        .multipart(MultipartForm::new().add_part("file", part))
        .await;

    assert_eq!(response.status_code(), 403);
}
