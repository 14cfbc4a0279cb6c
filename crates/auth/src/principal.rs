use serde::Serialize;

use retailpos_core::UserId;

use crate::{Permission, Role};

/// An authenticated user resolved for authorization decisions.
///
/// Built by the API layer from the session's user; permissions come from the
/// role policy in [`crate::permissions_for_role`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn new(user_id: UserId, email: String, name: String, role: Role) -> Self {
        Self {
            user_id,
            email,
            name,
            role,
            permissions: crate::permissions_for_role(role),
        }
    }
}
