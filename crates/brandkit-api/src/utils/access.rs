//! Authorization guards shared by handlers.

use brandkit_core::models::{BrandAsset, Client, UserRole};
use brandkit_core::permissions::REASON_NOT_FOUND;
use brandkit_core::{check_asset_permission, AppError, AssetAction};
use brandkit_db::Repositories;
use uuid::Uuid;

use crate::auth::AuthUser;

/// Fail with 403 unless the effective role is at least `minimum`
pub fn require_role(auth: &AuthUser, minimum: UserRole) -> Result<(), AppError> {
    if auth.role().at_least(minimum) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "This action requires the {} role",
            minimum.as_str().replace('_', " ")
        )))
    }
}

/// Load a client the caller can see. Unknown clients are 404, foreign ones 403.
pub async fn require_client(
    repos: &Repositories,
    auth: &AuthUser,
    client_id: Uuid,
) -> Result<Client, AppError> {
    let client = repos
        .clients
        .get(client_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".to_string()))?;
    if !auth.actor.can_access_client(client_id) {
        return Err(AppError::Forbidden(
            "User does not have access to this client".to_string(),
        ));
    }
    Ok(client)
}

/// Run the asset permission check and turn a denial into an error
pub fn authorize_asset(
    auth: &AuthUser,
    asset: Option<BrandAsset>,
    action: AssetAction,
) -> Result<BrandAsset, AppError> {
    let decision = check_asset_permission(&auth.actor, asset.as_ref(), action);
    match (decision.allowed, asset) {
        (true, Some(asset)) => Ok(asset),
        _ => {
            let reason = decision
                .reason
                .unwrap_or_else(|| REASON_NOT_FOUND.to_string());
            tracing::debug!(user_id = %auth.user_id(), ?action, reason = %reason, "Asset access denied");
            if reason == REASON_NOT_FOUND {
                Err(AppError::NotFound(reason))
            } else {
                Err(AppError::Forbidden(reason))
            }
        }
    }
}
