use chrono::Utc;
use tracing::info;

use retailpos_auth::{NewUser, User, UserPatch, normalize_email};
use retailpos_core::{DomainError, Page, PageRequest, UserId, paginate};

use super::{AppServices, load};
use crate::app::dto::UserView;
use crate::app::errors::ServiceError;

impl AppServices {
    pub async fn list_users(&self, page: PageRequest) -> Result<Page<UserView>, ServiceError> {
        let mut users = self.stores.users.list().await?;
        users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(paginate(users, page).map(|u| UserView::from(&u)))
    }

    pub async fn get_user(&self, id: UserId) -> Result<UserView, ServiceError> {
        let user = load(&*self.stores.users, &id.to_string(), "user").await?;
        Ok(UserView::from(&user))
    }

    pub async fn create_user(&self, input: NewUser) -> Result<UserView, ServiceError> {
        let _gate = self.write_lock().await;
        let email = normalize_email(&input.email);
        if self.stores.users.list().await?.iter().any(|u| u.email == email) {
            return Err(DomainError::conflict(format!("email '{email}' is already in use")).into());
        }
        let user = User::create(UserId::new(), input, Utc::now())?;
        self.stores.users.insert(user.clone()).await?;
        info!(user_id = %user.id, role = %user.role, "user created");
        Ok(UserView::from(&user))
    }

    pub async fn update_user(&self, id: UserId, patch: UserPatch, acting: UserId) -> Result<UserView, ServiceError> {
        if id == acting && patch.active == Some(false) {
            return Err(DomainError::conflict("you cannot deactivate your own account").into());
        }
        let revoke = patch.password.is_some() || patch.active == Some(false);
        let mut user = load(&*self.stores.users, &id.to_string(), "user").await?;
        user.apply_patch(patch, Utc::now())?;
        self.stores.users.update(user.clone()).await?;
        if revoke && id != acting {
            self.revoke_sessions(id).await?;
        }
        Ok(UserView::from(&user))
    }

    /// Users are deactivated, never removed: sales and movements keep pointing at them.
    pub async fn deactivate_user(&self, id: UserId, acting: UserId) -> Result<(), ServiceError> {
        if id == acting {
            return Err(DomainError::conflict("you cannot deactivate your own account").into());
        }
        let mut user = load(&*self.stores.users, &id.to_string(), "user").await?;
        user.deactivate(Utc::now());
        self.stores.users.update(user).await?;
        self.revoke_sessions(id).await?;
        info!(user_id = %id, "user deactivated");
        Ok(())
    }
}
