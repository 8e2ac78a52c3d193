//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use brandkit_core::{colors, models};

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Brandkit API",
        version = "0.1.0",
        description = "Multi-tenant brand asset management: logos, colors, fonts and inspiration boards per client, with Google Drive import, Slack and Figma integrations. Asset URLs are always scoped by `clientId`."
    ),
    paths(
        // Auth
        handlers::auth::create_session,
        handlers::auth::delete_session,
        handlers::auth::current_user,
        handlers::auth::update_profile,
        handlers::auth::set_view_role,
        // Users
        handlers::users::list_users,
        handlers::users::update_user_role,
        handlers::users::delete_user,
        handlers::users::list_user_clients,
        handlers::users::add_user_to_client,
        handlers::users::remove_user_from_client,
        // Clients
        handlers::clients::list_clients,
        handlers::clients::create_client,
        handlers::clients::get_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,
        handlers::clients::list_client_users,
        // Assets
        handlers::assets::list_assets,
        handlers::assets::upload_asset,
        handlers::assets::create_color,
        handlers::assets::get_asset,
        handlers::assets::update_asset,
        handlers::assets::delete_asset,
        handlers::files::get_asset_file,
        handlers::files::convert_asset,
        handlers::files::list_converted,
        // Public links
        handlers::public_links::create_public_link,
        handlers::public_links::list_public_links,
        handlers::public_links::delete_public_link,
        handlers::public_links::serve_public_link,
        // Inspiration
        handlers::inspiration::list_sections,
        handlers::inspiration::create_section,
        handlers::inspiration::update_section,
        handlers::inspiration::delete_section,
        handlers::inspiration::upload_image,
        handlers::inspiration::delete_image,
        handlers::inspiration::get_image_file,
        // Invitations
        handlers::invitations::create_invitation,
        handlers::invitations::list_invitations,
        handlers::invitations::get_invitation,
        handlers::invitations::accept_invitation,
        handlers::invitations::revoke_invitation,
        // Integrations
        handlers::google::auth_url,
        handlers::google::status,
        handlers::google::disconnect,
        handlers::google::list_files,
        handlers::google::import,
        handlers::slack::slash_command,
        handlers::slack::register_workspace,
        handlers::slack::list_workspaces,
        handlers::slack::delete_workspace,
        handlers::slack::swatch,
        handlers::figma::connect,
        handlers::figma::get_connection,
        handlers::figma::disconnect,
        handlers::figma::sync,
    ),
    components(
        schemas(
            models::User,
            models::UserRole,
            models::CurrentUserResponse,
            models::UpdateUserRoleRequest,
            models::UpdateProfileRequest,
            models::Client,
            models::FeatureToggles,
            models::CreateClientRequest,
            models::UpdateClientRequest,
            models::AssetCategory,
            models::Visibility,
            models::BrandAsset,
            models::AssetResponse,
            models::UpdateAssetRequest,
            models::ConvertedAsset,
            models::PublicLink,
            models::PublicLinkResponse,
            models::CreatePublicLinkRequest,
            models::InspirationSection,
            models::InspirationImage,
            models::InspirationImageResponse,
            models::SectionWithImages,
            models::CreateSectionRequest,
            models::UpdateSectionRequest,
            models::Invitation,
            models::InvitationStatus,
            models::InvitationDetails,
            models::CreateInvitationRequest,
            models::AcceptInvitationRequest,
            models::SlackWorkspaceResponse,
            models::RegisterSlackWorkspaceRequest,
            models::ConnectFigmaRequest,
            models::FigmaConnectionResponse,
            colors::CreateColorRequest,
            colors::ColorType,
            handlers::auth::CreateSessionRequest,
            handlers::auth::SessionResponse,
            handlers::auth::ViewRoleRequest,
            handlers::files::ConvertRequest,
            handlers::invitations::CreateInvitationResponse,
            handlers::google::AuthUrlResponse,
            handlers::google::GoogleStatusResponse,
            handlers::google::ImportRequest,
            handlers::figma::FigmaSyncResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "auth", description = "Sign-in with Firebase, sessions and role preview"),
        (name = "users", description = "User administration and client membership"),
        (name = "clients", description = "Client (tenant) management"),
        (name = "assets", description = "Logos, colors, fonts and other brand files"),
        (name = "public-links", description = "Unauthenticated share links for asset files"),
        (name = "inspiration", description = "Inspiration boards"),
        (name = "invitations", description = "Email invitations"),
        (name = "google", description = "Google Drive connection and import"),
        (name = "slack", description = "Slack slash commands and workspaces"),
        (name = "figma", description = "Figma color sync")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_documents_client_scoped_asset_routes() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/assets/{id}/file"));
        assert!(spec.paths.paths.contains_key("/api/clients/{client_id}/google/import"));
    }
}
