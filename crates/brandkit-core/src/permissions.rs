//! Asset authorization.
//!
//! [`check_asset_permission`] is the single decision point for reading or
//! modifying a brand asset. It combines the caller's effective role, client
//! membership, asset ownership and visibility, and always explains a denial.

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{BrandAsset, UserRole, Visibility};

/// Operation being attempted on an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetAction {
    Read,
    Update,
    Delete,
    /// Create a public share link
    Share,
}

impl AssetAction {
    pub fn is_read(self) -> bool {
        matches!(self, AssetAction::Read)
    }
}

/// Outcome of a permission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PermissionDecision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PermissionDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

pub const REASON_NOT_FOUND: &str = "Asset not found";
pub const REASON_NOT_MEMBER: &str = "User does not have access to this client";
pub const REASON_PRIVATE: &str = "Asset is private";
pub const REASON_GUEST: &str = "Guests have read-only access";
pub const REASON_NOT_OWNER: &str = "Only the owner or an editor can modify this asset";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    /// Role stored on the account
    pub role: UserRole,
    /// Role a super admin is currently previewing the app as
    pub view_as: Option<UserRole>,
    pub client_ids: Vec<Uuid>,
}

impl Actor {
    pub fn new(user_id: Uuid, role: UserRole, client_ids: Vec<Uuid>) -> Self {
        Self {
            user_id,
            role,
            view_as: None,
            client_ids,
        }
    }

    /// Role used for every permission decision.
    ///
    /// `view_as` only takes effect for accounts whose stored role is super admin.
    pub fn effective_role(&self) -> UserRole {
        match (self.role, self.view_as) {
            (UserRole::SuperAdmin, Some(view_as)) => view_as,
            (role, _) => role,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.effective_role() == UserRole::SuperAdmin
    }

    pub fn is_member(&self, client_id: Uuid) -> bool {
        self.client_ids.contains(&client_id)
    }

    pub fn can_access_client(&self, client_id: Uuid) -> bool {
        self.is_super_admin() || self.is_member(client_id)
    }
}

/// Decide whether `actor` may perform `action` on `asset`.
pub fn check_asset_permission(
    actor: &Actor,
    asset: Option<&BrandAsset>,
    action: AssetAction,
) -> PermissionDecision {
    let Some(asset) = asset else {
        return PermissionDecision::deny(REASON_NOT_FOUND);
    };

    let role = actor.effective_role();
    if role == UserRole::SuperAdmin {
        return PermissionDecision::allow();
    }

    if !actor.is_member(asset.client_id) {
        return PermissionDecision::deny(REASON_NOT_MEMBER);
    }

    let is_owner = asset.uploaded_by == Some(actor.user_id);

    if action.is_read() {
        return match asset.visibility {
            Visibility::Shared => PermissionDecision::allow(),
            Visibility::Private if is_owner || role.at_least(UserRole::Admin) => {
                PermissionDecision::allow()
            }
            Visibility::Private => PermissionDecision::deny(REASON_PRIVATE),
        };
    }

    if role == UserRole::Guest {
        return PermissionDecision::deny(REASON_GUEST);
    }

    // Private assets stay hidden from non-owners below admin, even for writes.
    if asset.visibility == Visibility::Private && !is_owner && !role.at_least(UserRole::Admin) {
        return PermissionDecision::deny(REASON_PRIVATE);
    }

    if is_owner || role.at_least(UserRole::Editor) {
        PermissionDecision::allow()
    } else {
        PermissionDecision::deny(REASON_NOT_OWNER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetCategory;
    use chrono::Utc;

    fn asset(client_id: Uuid, owner: Uuid, visibility: Visibility) -> BrandAsset {
        BrandAsset {
            id: Uuid::new_v4(),
            client_id,
            name: "Primary logo".to_string(),
            category: AssetCategory::Logo,
            visibility,
            data: serde_json::json!({}),
            file_name: Some("logo.png".to_string()),
            mime_type: Some("image/png".to_string()),
            file_size: Some(10),
            storage_key: Some(format!("clients/{}/assets/x/logo.png", client_id)),
            uploaded_by: Some(owner),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_asset_is_denied() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::SuperAdmin, vec![]);
        let decision = check_asset_permission(&actor, None, AssetAction::Read);
        assert_eq!(decision, PermissionDecision::deny(REASON_NOT_FOUND));
    }

    #[test]
    fn super_admin_bypasses_membership() {
        let client = Uuid::new_v4();
        let a = asset(client, Uuid::new_v4(), Visibility::Private);
        let actor = Actor::new(Uuid::new_v4(), UserRole::SuperAdmin, vec![]);
        assert!(check_asset_permission(&actor, Some(&a), AssetAction::Delete).allowed);
    }

    #[test]
    fn non_member_is_denied() {
        let a = asset(Uuid::new_v4(), Uuid::new_v4(), Visibility::Shared);
        let actor = Actor::new(Uuid::new_v4(), UserRole::Admin, vec![Uuid::new_v4()]);
        let decision = check_asset_permission(&actor, Some(&a), AssetAction::Read);
        assert!(!decision.allowed);
        assert_eq!(decision.reason.as_deref(), Some(REASON_NOT_MEMBER));
    }

    #[test]
    fn guest_reads_shared_but_cannot_share() {
        let client = Uuid::new_v4();
        let a = asset(client, Uuid::new_v4(), Visibility::Shared);
        let guest = Actor::new(Uuid::new_v4(), UserRole::Guest, vec![client]);

        assert!(check_asset_permission(&guest, Some(&a), AssetAction::Read).allowed);

        let share = check_asset_permission(&guest, Some(&a), AssetAction::Share);
        assert!(!share.allowed);
        assert_eq!(share.reason.as_deref(), Some(REASON_GUEST));
    }

    #[test]
    fn guest_cannot_share_even_own_upload() {
        let client = Uuid::new_v4();
        let guest_id = Uuid::new_v4();
        let a = asset(client, guest_id, Visibility::Shared);
        let guest = Actor::new(guest_id, UserRole::Guest, vec![client]);
        assert!(!check_asset_permission(&guest, Some(&a), AssetAction::Share).allowed);
    }

    #[test]
    fn private_asset_visible_to_owner_and_admin_only() {
        let client = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let a = asset(client, owner, Visibility::Private);

        let owner_actor = Actor::new(owner, UserRole::Standard, vec![client]);
        let admin = Actor::new(Uuid::new_v4(), UserRole::Admin, vec![client]);
        let editor = Actor::new(Uuid::new_v4(), UserRole::Editor, vec![client]);
        let standard = Actor::new(Uuid::new_v4(), UserRole::Standard, vec![client]);

        assert!(check_asset_permission(&owner_actor, Some(&a), AssetAction::Read).allowed);
        assert!(check_asset_permission(&admin, Some(&a), AssetAction::Read).allowed);

        let editor_read = check_asset_permission(&editor, Some(&a), AssetAction::Read);
        assert_eq!(editor_read.reason.as_deref(), Some(REASON_PRIVATE));
        assert!(!check_asset_permission(&standard, Some(&a), AssetAction::Read).allowed);
        assert!(!check_asset_permission(&editor, Some(&a), AssetAction::Update).allowed);
    }

    #[test]
    fn standard_user_modifies_only_own_assets() {
        let client = Uuid::new_v4();
        let me = Uuid::new_v4();
        let mine = asset(client, me, Visibility::Shared);
        let theirs = asset(client, Uuid::new_v4(), Visibility::Shared);
        let actor = Actor::new(me, UserRole::Standard, vec![client]);

        assert!(check_asset_permission(&actor, Some(&mine), AssetAction::Delete).allowed);
        let decision = check_asset_permission(&actor, Some(&theirs), AssetAction::Update);
        assert_eq!(decision.reason.as_deref(), Some(REASON_NOT_OWNER));
    }

    #[test]
    fn editor_modifies_shared_assets() {
        let client = Uuid::new_v4();
        let a = asset(client, Uuid::new_v4(), Visibility::Shared);
        let editor = Actor::new(Uuid::new_v4(), UserRole::Editor, vec![client]);
        assert!(check_asset_permission(&editor, Some(&a), AssetAction::Share).allowed);
    }

    #[test]
    fn super_admin_viewing_as_guest_gets_guest_rules() {
        let client = Uuid::new_v4();
        let a = asset(client, Uuid::new_v4(), Visibility::Shared);
        let mut actor = Actor::new(Uuid::new_v4(), UserRole::SuperAdmin, vec![client]);
        actor.view_as = Some(UserRole::Guest);

        assert_eq!(actor.effective_role(), UserRole::Guest);
        assert!(check_asset_permission(&actor, Some(&a), AssetAction::Read).allowed);
        assert!(!check_asset_permission(&actor, Some(&a), AssetAction::Share).allowed);
    }

    #[test]
    fn view_as_ignored_for_non_super_admins() {
        let mut actor = Actor::new(Uuid::new_v4(), UserRole::Guest, vec![]);
        actor.view_as = Some(UserRole::SuperAdmin);
        assert_eq!(actor.effective_role(), UserRole::Guest);
        assert!(!actor.can_access_client(Uuid::new_v4()));
    }
}
