use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use retailpos_auth::{NewUser, Principal, Role, Session, SessionId, User, normalize_email};
use retailpos_core::UserId;

use super::{AppServices, load};
use crate::app::errors::ServiceError;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Periodically drop sessions nobody came back for.
pub fn spawn_session_sweeper(services: Arc<AppServices>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match services.purge_expired_sessions(Utc::now()).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "expired sessions purged"),
                Err(err) => warn!(error = %err, "session sweep failed"),
            }
        }
    })
}

impl AppServices {
    /// Look up the session behind a cookie value. Malformed, unknown and
    /// expired sessions all resolve to `None`; expired ones are removed.
    pub async fn resolve_session(&self, raw: &str) -> Result<Option<Session>, ServiceError> {
        let Some(id) = SessionId::parse(raw) else {
            return Ok(None);
        };
        let Some(session) = self.stores.sessions.get(id.as_str()).await? else {
            return Ok(None);
        };
        if session.is_expired(Utc::now()) {
            self.stores.sessions.delete(id.as_str()).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Delete every session expired at `now`; returns how many were removed.
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, ServiceError> {
        let mut removed = 0;
        for session in self.stores.sessions.list().await? {
            if session.is_expired(now) && self.stores.sessions.delete(session.id.as_str()).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub async fn start_anonymous_session(&self) -> Result<Session, ServiceError> {
        let session = Session::anonymous(Utc::now(), self.settings.session_ttl);
        self.stores.sessions.insert(session.clone()).await?;
        Ok(session)
    }

    /// Verify credentials and replace `current` with a fresh session bound to the user.
    pub async fn login(
        &self,
        current: Option<&Session>,
        email: &str,
        password: &str,
    ) -> Result<(Session, User), ServiceError> {
        let email = normalize_email(email);
        let found = self
            .stores
            .users
            .list()
            .await?
            .into_iter()
            .find(|u| u.email == email);

        let mut user = match found {
            Some(user) if user.verify_credentials(password) => user,
            _ => {
                warn!(email = %email, "rejected login");
                return Err(ServiceError::InvalidCredentials);
            }
        };

        let now = Utc::now();
        user.record_login(now);
        self.stores.users.update(user.clone()).await?;

        if let Some(old) = current {
            self.stores.sessions.delete(old.id.as_str()).await?;
        }
        let session = Session::authenticated(user.id, now, self.settings.session_ttl);
        self.stores.sessions.insert(session.clone()).await?;

        info!(user_id = %user.id, "user logged in");
        Ok((session, user))
    }

    pub async fn logout(&self, session: &Session) -> Result<(), ServiceError> {
        self.stores.sessions.delete(session.id.as_str()).await?;
        if let Some(user_id) = session.user_id {
            info!(user_id = %user_id, "user logged out");
        }
        Ok(())
    }

    /// Principal for an authenticated session whose user is still active.
    pub async fn principal_for(&self, session: &Session) -> Result<Principal, ServiceError> {
        let user_id = session.user_id.ok_or(ServiceError::Unauthenticated)?;
        let user = self
            .stores
            .users
            .get(&user_id.to_string())
            .await?
            .filter(|u| u.active)
            .ok_or(ServiceError::Unauthenticated)?;
        Ok(Principal::new(user.id, user.email, user.name, user.role))
    }

    pub async fn current_user(&self, user_id: UserId) -> Result<User, ServiceError> {
        load(&*self.stores.users, &user_id.to_string(), "user").await
    }

    /// Create the first admin account when no user exists. Returns whether one was created.
    pub async fn bootstrap_admin(&self, email: &str, password: &str) -> Result<bool, ServiceError> {
        if !self.stores.users.list().await?.is_empty() {
            return Ok(false);
        }
        let admin = User::create(
            UserId::new(),
            NewUser {
                email: email.to_string(),
                name: "Administrador".to_string(),
                role: Role::Admin,
                password: password.to_string(),
            },
            Utc::now(),
        )?;
        info!(email = %admin.email, "bootstrapped admin user");
        self.stores.users.insert(admin).await?;
        Ok(true)
    }

    /// Drop every session of a user (after deactivation or password change).
    pub(super) async fn revoke_sessions(&self, user_id: UserId) -> Result<(), ServiceError> {
        for session in self.stores.sessions.list().await? {
            if session.user_id == Some(user_id) {
                self.stores.sessions.delete(session.id.as_str()).await?;
            }
        }
        Ok(())
    }
}
