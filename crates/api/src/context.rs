use retailpos_auth::{Principal, Session};

/// Live session resolved from the cookie, when the request carried one.
#[derive(Debug, Clone)]
pub struct SessionContext(pub Session);

/// Authenticated user for a request.
///
/// Present on every protected route.
#[derive(Debug, Clone)]
pub struct PrincipalContext(pub Principal);

impl PrincipalContext {
    pub fn principal(&self) -> &Principal {
        &self.0
    }
}
