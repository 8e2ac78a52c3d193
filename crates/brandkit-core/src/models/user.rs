use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Account role, ordered from most to least privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Editor,
    Standard,
    Guest,
}

impl UserRole {
    pub const ALL: [UserRole; 5] = [
        UserRole::SuperAdmin,
        UserRole::Admin,
        UserRole::Editor,
        UserRole::Standard,
        UserRole::Guest,
    ];

    /// Privilege rank; higher is more privileged.
    pub fn rank(self) -> u8 {
        match self {
            UserRole::SuperAdmin => 4,
            UserRole::Admin => 3,
            UserRole::Editor => 2,
            UserRole::Standard => 1,
            UserRole::Guest => 0,
        }
    }

    pub fn at_least(self, other: UserRole) -> bool {
        self.rank() >= other.rank()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Admin => "admin",
            UserRole::Editor => "editor",
            UserRole::Standard => "standard",
            UserRole::Guest => "guest",
        }
    }

    pub fn can_manage_users(self) -> bool {
        self.at_least(UserRole::Admin)
    }

    pub fn can_manage_clients(self) -> bool {
        self == UserRole::SuperAdmin
    }

    pub fn can_invite(self) -> bool {
        self.at_least(UserRole::Admin)
    }

    pub fn can_upload(self) -> bool {
        self.at_least(UserRole::Standard)
    }

    /// Super admins may hand out any role; admins any role up to admin.
    pub fn can_assign_role(self, target: UserRole) -> bool {
        match self {
            UserRole::SuperAdmin => true,
            UserRole::Admin => target != UserRole::SuperAdmin,
            _ => false,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "super_admin" => Ok(UserRole::SuperAdmin),
            "admin" => Ok(UserRole::Admin),
            "editor" => Ok(UserRole::Editor),
            "standard" => Ok(UserRole::Standard),
            "guest" => Ok(UserRole::Guest),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// Application user. Identity is delegated to Firebase; `firebase_uid` links the two.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub firebase_uid: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub firebase_uid: Option<String>,
}

/// The signed-in user as seen by the frontend
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CurrentUserResponse {
    #[serde(flatten)]
    pub user: User,
    /// Role used for permission checks; differs from `role` while a super admin previews another role
    pub effective_role: UserRole,
    pub view_as: Option<UserRole>,
    pub client_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
}
