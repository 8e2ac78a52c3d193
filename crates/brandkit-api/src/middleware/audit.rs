//! Audit trail. Every line goes to the `audit` tracing target so it can be
//! routed separately from application logs.

use brandkit_core::models::UserRole;
use uuid::Uuid;

pub fn log_authentication(
    user_id: Option<Uuid>,
    email: Option<&str>,
    method: &'static str,
    success: bool,
    reason: Option<&str>,
) {
    if success {
        tracing::info!(
            target: "audit",
            event = "authentication",
            user_id = ?user_id,
            email = ?email,
            method,
            success,
            "Authentication succeeded"
        );
    } else {
        tracing::warn!(
            target: "audit",
            event = "authentication",
            user_id = ?user_id,
            email = ?email,
            method,
            success,
            reason = ?reason,
            "Authentication failed"
        );
    }
}

pub fn log_role_change(actor_id: Uuid, user_id: Uuid, from: UserRole, to: UserRole) {
    tracing::info!(
        target: "audit",
        event = "role_change",
        actor_id = %actor_id,
        user_id = %user_id,
        from = from.as_str(),
        to = to.as_str(),
        "User role changed"
    );
}

pub fn log_view_role(actor_id: Uuid, view_as: Option<UserRole>) {
    tracing::info!(
        target: "audit",
        event = "view_role",
        actor_id = %actor_id,
        view_as = view_as.map(|r| r.as_str()).unwrap_or("super_admin"),
        "Viewing role switched"
    );
}

pub fn log_membership_change(actor_id: Uuid, user_id: Uuid, client_id: Uuid, added: bool) {
    let event = if added {
        "membership_added"
    } else {
        "membership_removed"
    };
    tracing::info!(
        target: "audit",
        event,
        actor_id = %actor_id,
        user_id = %user_id,
        client_id = %client_id,
        "Client membership changed"
    );
}

pub fn log_user_deleted(actor_id: Uuid, user_id: Uuid) {
    tracing::info!(
        target: "audit",
        event = "user_deleted",
        actor_id = %actor_id,
        user_id = %user_id,
        "User deleted"
    );
}

pub fn log_invitation(event: &'static str, actor_id: Option<Uuid>, invitation_id: Uuid, email: &str) {
    tracing::info!(
        target: "audit",
        event,
        actor_id = ?actor_id,
        invitation_id = %invitation_id,
        email = %email,
        "Invitation event"
    );
}

pub fn log_public_link(event: &'static str, actor_id: Option<Uuid>, link_id: Uuid, asset_id: Uuid) {
    tracing::info!(
        target: "audit",
        event,
        actor_id = ?actor_id,
        link_id = %link_id,
        asset_id = %asset_id,
        "Public link event"
    );
}
