//! Cookie sessions and their CSRF tokens.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use retailpos_core::{Entity, UserId};

/// Opaque session key (64 lowercase hex chars, 256 random bits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(random_token())
    }

    /// Accepts only well-formed keys; anything else is treated as no session.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let well_formed = raw.len() == 64 && raw.bytes().all(|b| b.is_ascii_hexdigit());
        well_formed.then(|| Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-side session record.
///
/// Anonymous sessions (no `user_id`) exist so the login form itself can be
/// CSRF-protected. Logging in replaces the session with a fresh id and token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: Option<UserId>,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn anonymous(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: SessionId::generate(),
            user_id: None,
            csrf_token: random_token(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// New session bound to `user_id`; never reuses the previous id or token.
    pub fn authenticated(user_id: UserId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::anonymous(now, ttl)
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Constant-time comparison of a presented token with the session's token.
    pub fn verify_csrf(&self, presented: &str) -> bool {
        constant_time_eq(self.csrf_token.as_bytes(), presented.trim().as_bytes())
    }
}

impl Entity for Session {
    type Id = SessionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
