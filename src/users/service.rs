//! User Service
//! Mission: Admin account management and self-service profile edits

use crate::auth::models::Role;
use crate::auth::password::PasswordHasher;
use crate::config::BootstrapAdmin;
use crate::errors::AppError;
use crate::response::PaginationMeta;
use crate::users::models::{
    CreateUserRequest, NewUser, UpdateProfileRequest, UpdateUserRequest, User,
};
use crate::users::query::UserFilter;
use crate::users::store::UserRepository;
use crate::validation::FieldChecks;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Check username, then email, then phone against active accounts; the first
/// taken value wins. `None` skips a field.
pub fn ensure_unique(
    users: &dyn UserRepository,
    username: Option<&str>,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<(), AppError> {
    if let Some(username) = username {
        if users.exists_by_username(username)? {
            return Err(AppError::Conflict("username already exists".into()));
        }
    }
    if let Some(email) = email {
        if users.exists_by_email(email)? {
            return Err(AppError::Conflict("email already exists".into()));
        }
    }
    if let Some(phone) = phone {
        if users.exists_by_phone(phone)? {
            return Err(AppError::Conflict("phone already exists".into()));
        }
    }
    Ok(())
}

/// `Some(new)` when `new` is non-empty and differs from `current`
fn changed<'a>(new: &'a str, current: &str) -> Option<&'a str> {
    (!new.is_empty() && new != current).then_some(new)
}

pub struct UserService {
    users: Arc<dyn UserRepository>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }

    /// Admin-only creation path; the role must be given explicitly
    pub fn create_user(&self, req: &CreateUserRequest) -> Result<User, AppError> {
        let mut checks = FieldChecks::new();
        checks
            .username(&req.username, true)
            .email(&req.email, true)
            .phone(&req.phone, true)
            .password(&req.password, &req.confirm_password);
        let role = checks.role(&req.role, true);
        checks.finish()?;
        let role = role.ok_or_else(|| AppError::bad_request("invalid role"))?;

        ensure_unique(
            self.users.as_ref(),
            Some(&req.username),
            Some(&req.email),
            Some(&req.phone),
        )?;

        let password_hash = self.hasher.hash(&req.password)?;
        self.users
            .create(&NewUser {
                username: req.username.clone(),
                email: req.email.clone(),
                phone: req.phone.clone(),
                password_hash,
                role,
            })
            .map_err(AppError::from_store)
    }

    pub fn update_user(&self, id: i64, req: &UpdateUserRequest) -> Result<User, AppError> {
        let mut checks = FieldChecks::new();
        checks
            .username(&req.username, false)
            .email(&req.email, false)
            .phone(&req.phone, false);
        let role = checks.role(&req.role, false);
        checks.finish()?;

        let mut user = self.get_user_by_id(id)?;
        self.apply_identity_changes(&mut user, &req.username, &req.email, &req.phone)?;
        if let Some(role) = role {
            user.role = role;
        }

        self.save(&user)
    }

    /// Soft delete; an admin cannot remove their own account
    pub fn delete_user(&self, id: i64, acting_user_id: i64) -> Result<(), AppError> {
        if id == acting_user_id {
            return Err(AppError::bad_request("You cannot delete your own account"));
        }
        if !self.users.soft_delete(id)? {
            return Err(AppError::user_not_found());
        }
        Ok(())
    }

    pub fn hard_delete_user(&self, id: i64, acting_user_id: i64) -> Result<(), AppError> {
        if id == acting_user_id {
            return Err(AppError::bad_request("You cannot delete your own account"));
        }
        if !self.users.hard_delete(id)? {
            return Err(AppError::user_not_found());
        }
        warn!("User {} permanently deleted by {}", id, acting_user_id);
        Ok(())
    }

    /// Clear the soft-delete marker. Fails with `Conflict` when an active
    /// account now holds the same username, email or phone.
    pub fn restore_user(&self, id: i64) -> Result<(), AppError> {
        let restored = self.users.restore(id).map_err(AppError::from_store)?;
        if !restored {
            return Err(AppError::NotFound("deleted user not found".into()));
        }
        Ok(())
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<User, AppError> {
        self.users
            .find_by_id(id)?
            .ok_or_else(AppError::user_not_found)
    }

    pub fn list_users(&self, filter: &UserFilter) -> Result<(Vec<User>, PaginationMeta), AppError> {
        let (users, total) = self.users.find_all(filter)?;
        Ok((users, PaginationMeta::new(filter.page, filter.limit, total)))
    }

    pub fn list_deleted_users(
        &self,
        filter: &UserFilter,
    ) -> Result<(Vec<User>, PaginationMeta), AppError> {
        let (users, total) = self.users.find_all_deleted(filter)?;
        Ok((users, PaginationMeta::new(filter.page, filter.limit, total)))
    }

    pub fn get_profile(&self, user_id: i64) -> Result<User, AppError> {
        self.get_user_by_id(user_id)
    }

    pub fn update_profile(
        &self,
        user_id: i64,
        req: &UpdateProfileRequest,
    ) -> Result<User, AppError> {
        FieldChecks::new()
            .username(&req.username, false)
            .email(&req.email, false)
            .phone(&req.phone, false)
            .finish()?;

        let mut user = self.get_user_by_id(user_id)?;
        self.apply_identity_changes(&mut user, &req.username, &req.email, &req.phone)?;
        self.save(&user)
    }

    /// Seed one admin when the store has none
    pub fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<Option<User>> {
        if self.users.count_by_role(Role::Admin)? > 0 {
            return Ok(None);
        }

        let user = self
            .create_user(&CreateUserRequest {
                username: admin.username.clone(),
                email: admin.email.clone(),
                phone: admin.phone.clone(),
                password: admin.password.clone(),
                confirm_password: admin.password.clone(),
                role: Role::Admin.as_str().to_string(),
            })
            .map_err(|e| anyhow::anyhow!("Failed to seed admin account: {e}"))?;

        info!("Bootstrap admin created: {}", user.username);
        Ok(Some(user))
    }

    fn apply_identity_changes(
        &self,
        user: &mut User,
        username: &str,
        email: &str,
        phone: &str,
    ) -> Result<(), AppError> {
        let new_username = changed(username, &user.username);
        let new_email = changed(email, &user.email);
        let new_phone = changed(phone, &user.phone);

        ensure_unique(self.users.as_ref(), new_username, new_email, new_phone)?;

        if let Some(username) = new_username {
            user.username = username.to_string();
        }
        if let Some(email) = new_email {
            user.email = email.to_string();
        }
        if let Some(phone) = new_phone {
            user.phone = phone.to_string();
        }
        Ok(())
    }

    fn save(&self, user: &User) -> Result<User, AppError> {
        self.users
            .update(user)
            .map_err(AppError::from_store)?
            .ok_or_else(AppError::user_not_found)
    }
}
