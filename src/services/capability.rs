//! The single place where roles are turned into permissions.

use crate::{error::AppError, models::user::User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Moderator,
    Member,
    Suspended,
}

impl Role {
    pub fn of(user: &User) -> Self {
        if user.is_suspended {
            Role::Suspended
        } else if user.is_admin {
            Role::Admin
        } else if user.is_moderator {
            Role::Moderator
        } else {
            Role::Member
        }
    }

    /// Claim value stored in issued tokens.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Member => "user",
            Role::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    PinPost,
    ModeratePost,
    ModerateUsers,
    ManageRoles,
    DeleteUsers,
    ManageAdvertising,
    ViewAdminPanel,
}

impl Capability {
    fn describe(self) -> &'static str {
        match self {
            Capability::PinPost => "pin posts",
            Capability::ModeratePost => "moderate posts",
            Capability::ModerateUsers => "moderate users",
            Capability::ManageRoles => "change user roles",
            Capability::DeleteUsers => "delete users",
            Capability::ManageAdvertising => "manage advertising",
            Capability::ViewAdminPanel => "access the admin panel",
        }
    }
}

pub fn allows(role: Role, capability: Capability) -> bool {
    match role {
        Role::Admin => true,
        Role::Moderator => matches!(
            capability,
            Capability::PinPost
                | Capability::ModeratePost
                | Capability::ModerateUsers
                | Capability::ViewAdminPanel
        ),
        Role::Member | Role::Suspended => false,
    }
}

/// Rejects `user` with 403 unless their current role grants `capability`.
pub fn require(user: &User, capability: Capability) -> Result<(), AppError> {
    if allows(Role::of(user), capability) {
        Ok(())
    } else {
        tracing::warn!(user_id = user.id, ?capability, "capability check failed");
        Err(AppError::Forbidden(format!(
            "You do not have permission to {}",
            capability.describe()
        )))
    }
}
