//! `retailpos-auth`: users, roles, sessions and the authorization boundary.
//!
//! No HTTP or storage code lives here.

pub mod authorize;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod session;
pub mod user;

pub use authorize::{AuthzError, authorize, permissions_for_role};
pub use password::{hash_password, verify_password};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::Role;
pub use session::{Session, SessionId};
pub use user::{NewUser, User, UserPatch, normalize_email};
