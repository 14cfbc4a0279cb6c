//! Permission checks at the handler boundary.

use retailpos_auth::{Permission, authorize};

use crate::app::errors::ServiceError;
use crate::context::PrincipalContext;

/// Fail with `403 forbidden` unless the principal holds `permission`.
pub fn require(principal: &PrincipalContext, permission: &'static str) -> Result<(), ServiceError> {
    authorize(principal.principal(), &Permission::new(permission))?;
    Ok(())
}
