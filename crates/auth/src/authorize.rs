use thiserror::Error;

use crate::{Permission, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Permissions every staff role may use at the counter.
const COUNTER: &[&str] = &[
    "products.read",
    "stock.read",
    "sales.read",
    "sales.create",
    "pix.operate",
    "dashboard.read",
];

/// Everything except user administration.
const MANAGER: &[&str] = &[
    "products.read",
    "products.write",
    "stock.read",
    "stock.write",
    "sales.read",
    "sales.create",
    "sales.cancel",
    "sellers.write",
    "pix.operate",
    "cash.read",
    "cash.operate",
    "finance.read",
    "finance.write",
    "dashboard.read",
];

/// Role → permission policy.
pub fn permissions_for_role(role: Role) -> Vec<Permission> {
    let names: Vec<&'static str> = match role {
        Role::Admin => vec![Permission::WILDCARD],
        Role::Manager => MANAGER.to_vec(),
        Role::Cashier => {
            let mut names = COUNTER.to_vec();
            names.extend(["cash.read", "cash.operate"]);
            names
        }
        Role::Seller => COUNTER.to_vec(),
    };
    names.into_iter().map(Permission::new).collect()
}

/// Authorize a principal for one permission.
///
/// - No IO
/// - No panics
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p.as_str() == required.as_str());

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retailpos_core::UserId;

    fn principal(role: Role) -> Principal {
        Principal::new(UserId::new(), "a@b.c".into(), "A".into(), role)
    }

    #[test]
    fn admin_wildcard_allows_anything() {
        assert!(authorize(&principal(Role::Admin), &Permission::new("users.manage")).is_ok());
        assert!(authorize(&principal(Role::Admin), &Permission::new("anything.at.all")).is_ok());
    }

    #[test]
    fn manager_cannot_manage_users() {
        let p = principal(Role::Manager);
        assert!(authorize(&p, &Permission::new("finance.write")).is_ok());
        assert_eq!(
            authorize(&p, &Permission::new("users.manage")),
            Err(AuthzError::Forbidden("users.manage".into()))
        );
    }

    #[test]
    fn cashier_operates_cash_but_seller_does_not() {
        let cash = Permission::new("cash.operate");
        assert!(authorize(&principal(Role::Cashier), &cash).is_ok());
        assert!(authorize(&principal(Role::Seller), &cash).is_err());
    }

    #[test]
    fn counter_roles_cannot_cancel_sales() {
        let cancel = Permission::new("sales.cancel");
        assert!(authorize(&principal(Role::Seller), &cancel).is_err());
        assert!(authorize(&principal(Role::Cashier), &cancel).is_err());
        assert!(authorize(&principal(Role::Seller), &Permission::new("sales.create")).is_ok());
    }
}
