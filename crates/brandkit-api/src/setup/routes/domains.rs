//! Domain route groups.

use std::sync::Arc;

use axum::routing::{delete, get, patch, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Routes reachable without a session
pub fn public_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/auth/session",
            post(handlers::auth::create_session).delete(handlers::auth::delete_session),
        )
        .route(
            "/api/invitations/{token}",
            get(handlers::invitations::get_invitation),
        )
        .route(
            "/api/invitations/{token}/accept",
            post(handlers::invitations::accept_invitation),
        )
        .route(
            "/api/public/{token}",
            get(handlers::public_links::serve_public_link),
        )
        .route("/api/google/callback", get(handlers::google::oauth_callback))
        .route("/api/slack/commands", post(handlers::slack::slash_command))
        .route("/api/slack/swatch/{hex}", get(handlers::slack::swatch))
}

/// Routes behind the session middleware
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(client_routes())
        .merge(asset_routes())
        .merge(inspiration_routes())
        .merge(invitation_routes())
        .merge(integration_routes())
}

fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/user",
            get(handlers::auth::current_user).patch(handlers::auth::update_profile),
        )
        .route("/api/auth/view-role", post(handlers::auth::set_view_role))
}

fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(handlers::users::list_users))
        .route("/api/users/{id}", delete(handlers::users::delete_user))
        .route("/api/users/{id}/role", patch(handlers::users::update_user_role))
        .route(
            "/api/users/{id}/clients",
            get(handlers::users::list_user_clients),
        )
        .route(
            "/api/users/{id}/clients/{client_id}",
            post(handlers::users::add_user_to_client)
                .delete(handlers::users::remove_user_from_client),
        )
}

fn client_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/clients",
            get(handlers::clients::list_clients).post(handlers::clients::create_client),
        )
        .route(
            "/api/clients/{client_id}",
            get(handlers::clients::get_client)
                .patch(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/api/clients/{client_id}/users",
            get(handlers::clients::list_client_users),
        )
}

fn asset_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/clients/{client_id}/assets",
            get(handlers::assets::list_assets).post(handlers::assets::upload_asset),
        )
        .route(
            "/api/clients/{client_id}/colors",
            post(handlers::assets::create_color),
        )
        .route(
            "/api/assets/{id}",
            get(handlers::assets::get_asset)
                .patch(handlers::assets::update_asset)
                .delete(handlers::assets::delete_asset),
        )
        .route("/api/assets/{id}/file", get(handlers::files::get_asset_file))
        .route("/api/assets/{id}/convert", post(handlers::files::convert_asset))
        .route(
            "/api/assets/{id}/converted",
            get(handlers::files::list_converted),
        )
        .route(
            "/api/assets/{id}/public-links",
            get(handlers::public_links::list_public_links)
                .post(handlers::public_links::create_public_link),
        )
        .route(
            "/api/public-links/{id}",
            delete(handlers::public_links::delete_public_link),
        )
}

fn inspiration_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/clients/{client_id}/inspiration/sections",
            get(handlers::inspiration::list_sections).post(handlers::inspiration::create_section),
        )
        .route(
            "/api/clients/{client_id}/inspiration/sections/{id}",
            patch(handlers::inspiration::update_section)
                .delete(handlers::inspiration::delete_section),
        )
        .route(
            "/api/clients/{client_id}/inspiration/sections/{id}/images",
            post(handlers::inspiration::upload_image),
        )
        .route(
            "/api/clients/{client_id}/inspiration/images/{id}",
            delete(handlers::inspiration::delete_image),
        )
        .route(
            "/api/clients/{client_id}/inspiration/images/{id}/file",
            get(handlers::inspiration::get_image_file),
        )
}

fn invitation_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/invitations",
            get(handlers::invitations::list_invitations)
                .post(handlers::invitations::create_invitation),
        )
        // Shares its path with the public token lookup, so the segment keeps that name
        .route(
            "/api/invitations/{token}",
            delete(handlers::invitations::revoke_invitation),
        )
}

fn integration_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/google/auth-url", get(handlers::google::auth_url))
        .route("/api/google/status", get(handlers::google::status))
        .route("/api/google/connection", delete(handlers::google::disconnect))
        .route("/api/google/files", get(handlers::google::list_files))
        .route(
            "/api/clients/{client_id}/google/import",
            post(handlers::google::import),
        )
        .route(
            "/api/clients/{client_id}/slack/workspaces",
            get(handlers::slack::list_workspaces).post(handlers::slack::register_workspace),
        )
        .route(
            "/api/slack/workspaces/{team_id}",
            delete(handlers::slack::delete_workspace),
        )
        .route(
            "/api/clients/{client_id}/figma",
            get(handlers::figma::get_connection)
                .put(handlers::figma::connect)
                .delete(handlers::figma::disconnect),
        )
        .route("/api/clients/{client_id}/figma/sync", post(handlers::figma::sync))
}
