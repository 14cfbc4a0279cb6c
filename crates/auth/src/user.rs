//! Staff user accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retailpos_core::{DomainError, DomainResult, Entity, UserId};

use crate::{Role, password};

/// A staff account able to log in.
///
/// # Invariants
/// - `email` is trimmed and lowercased; uniqueness is enforced by the caller.
/// - `password_hash` is always an Argon2 PHC string.
/// - Inactive users cannot authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password_hash: String,
    pub active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub password: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
    pub active: Option<bool>,
}

/// Normalize an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> DomainResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(DomainError::validation(format!("invalid email '{email}'")))
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(name.to_string())
}

impl User {
    /// Validate input, hash the password and build the account.
    pub fn create(id: UserId, input: NewUser, now: DateTime<Utc>) -> DomainResult<Self> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;
        let name = validate_name(&input.name)?;
        let password_hash = password::hash_password(&input.password)?;

        Ok(Self {
            id,
            email,
            name,
            role: input.role,
            password_hash,
            active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: UserPatch, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = patch.name {
            self.name = validate_name(&name)?;
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(password) = patch.password {
            self.password_hash = password::hash_password(&password)?;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) {
        self.active = false;
        self.updated_at = now;
    }

    /// Check credentials; inactive accounts never authenticate.
    pub fn verify_credentials(&self, password: &str) -> bool {
        self.active && password::verify_password(password, &self.password_hash)
    }

    pub fn record_login(&mut self, now: DateTime<Utc>) {
        self.last_login_at = Some(now);
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            name: "  Maria Souza ".to_string(),
            role: Role::Cashier,
            password: "s3cret-pass".to_string(),
        }
    }

    #[test]
    fn create_normalizes_email_and_name() {
        let user = User::create(UserId::new(), new_user("  Maria@Loja.COM "), Utc::now()).unwrap();
        assert_eq!(user.email, "maria@loja.com");
        assert_eq!(user.name, "Maria Souza");
        assert!(user.active);
        assert!(user.verify_credentials("s3cret-pass"));
    }

    #[test]
    fn create_rejects_bad_email() {
        for email in ["no-at-sign", "@loja.com", "maria@", "a@b@c"] {
            let err = User::create(UserId::new(), new_user(email), Utc::now()).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{email}");
        }
    }

    #[test]
    fn inactive_user_cannot_authenticate() {
        let mut user = User::create(UserId::new(), new_user("x@y.z"), Utc::now()).unwrap();
        user.deactivate(Utc::now());
        assert!(!user.verify_credentials("s3cret-pass"));
    }

    #[test]
    fn patch_changes_password_and_role() {
        let mut user = User::create(UserId::new(), new_user("x@y.z"), Utc::now()).unwrap();
        let patch = UserPatch {
            role: Some(Role::Manager),
            password: Some("another-pass".into()),
            ..Default::default()
        };
        user.apply_patch(patch, Utc::now()).unwrap();
        assert_eq!(user.role, Role::Manager);
        assert!(user.verify_credentials("another-pass"));
        assert!(!user.verify_credentials("s3cret-pass"));
    }

    #[test]
    fn patch_with_empty_name_fails() {
        let mut user = User::create(UserId::new(), new_user("x@y.z"), Utc::now()).unwrap();
        let patch = UserPatch {
            name: Some("   ".into()),
            ..Default::default()
        };
        assert!(user.apply_patch(patch, Utc::now()).is_err());
    }
}
