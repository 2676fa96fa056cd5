use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::auth::{
    AuthError, ensure_password, hash_password_async, normalize_account, normalize_email,
};
use crate::application::pagination::{Page, PageRequest};
use crate::application::repos::{
    CreateUserParams, RepoError, UpdateUserParams, UserChangeOutcome, UsersRepo,
};
use crate::domain::entities::UserRecord;
use crate::domain::types::Role;
use crate::domain::users::{LAST_SUPERADMIN, can_manage};
use crate::domain::workflow::Actor;

#[derive(Debug, Error)]
pub enum UserAdminError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("user not found")]
    NotFound,
    #[error("role `{}` may not manage this account", .0.as_str())]
    Forbidden(Role),
    #[error("{}", LAST_SUPERADMIN)]
    LastSuperadmin,
    #[error("an account with this email or username already exists")]
    AccountExists,
    #[error(transparent)]
    Auth(AuthError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for UserAdminError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { .. } => UserAdminError::AccountExists,
            other => UserAdminError::Repo(other),
        }
    }
}

impl From<AuthError> for UserAdminError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::ConstraintViolation(field) => UserAdminError::ConstraintViolation(field),
            AuthError::AccountExists => UserAdminError::AccountExists,
            other => UserAdminError::Auth(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserCommand {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Clone)]
pub struct UserAdminService {
    users: Arc<dyn UsersRepo>,
}

impl UserAdminService {
    pub fn new(users: Arc<dyn UsersRepo>) -> Self {
        Self { users }
    }

    pub async fn list(&self, page: PageRequest) -> Result<Page<UserRecord>, UserAdminError> {
        self.users
            .list_users(page)
            .await
            .map_err(UserAdminError::from)
    }

    pub async fn create(
        &self,
        actor: Actor,
        command: CreateUserCommand,
    ) -> Result<UserRecord, UserAdminError> {
        if !can_manage(actor.role, command.role, Some(command.role)) {
            return Err(UserAdminError::Forbidden(actor.role));
        }
        let fields = normalize_account(&command.username, &command.email)?;
        ensure_password(&command.password)?;
        let password_hash = hash_password_async(&command.password).await?;

        let user = self
            .users
            .create_user(CreateUserParams {
                username: fields.username,
                email: fields.email,
                password_hash,
                role: command.role,
            })
            .await?;

        info!(
            target = "sylheti_archive::admin::users",
            user_id = %user.id,
            role = user.role.as_str(),
            actor = %actor.id,
            "user created"
        );
        Ok(user)
    }

    pub async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        command: UpdateUserCommand,
    ) -> Result<UserRecord, UserAdminError> {
        let target = self
            .users
            .find_user(id)
            .await?
            .ok_or(UserAdminError::NotFound)?;
        if !can_manage(actor.role, target.role, command.role) {
            return Err(UserAdminError::Forbidden(actor.role));
        }

        let username = match command.username {
            Some(username) => {
                let trimmed = username.trim();
                if trimmed.is_empty() {
                    return Err(UserAdminError::ConstraintViolation("username"));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };
        let email = command
            .email
            .as_deref()
            .map(normalize_email)
            .transpose()?;
        let password_hash = match command.password {
            Some(password) => {
                ensure_password(&password)?;
                Some(hash_password_async(&password).await?)
            }
            None => None,
        };

        let outcome = self
            .users
            .update_user(
                id,
                UpdateUserParams {
                    username,
                    email,
                    password_hash,
                    role: command.role,
                },
            )
            .await?;

        match outcome {
            UserChangeOutcome::Updated(user) => {
                info!(
                    target = "sylheti_archive::admin::users",
                    user_id = %user.id,
                    role = user.role.as_str(),
                    actor = %actor.id,
                    "user updated"
                );
                Ok(user)
            }
            UserChangeOutcome::LastSuperadmin => {
                warn!(
                    target = "sylheti_archive::admin::users",
                    user_id = %id,
                    actor = %actor.id,
                    "refused to demote the last superadmin"
                );
                Err(UserAdminError::LastSuperadmin)
            }
            UserChangeOutcome::NotFound | UserChangeOutcome::Deleted => {
                Err(UserAdminError::NotFound)
            }
        }
    }

    pub async fn delete(&self, actor: Actor, id: Uuid) -> Result<(), UserAdminError> {
        let target = self
            .users
            .find_user(id)
            .await?
            .ok_or(UserAdminError::NotFound)?;
        if !can_manage(actor.role, target.role, None) {
            return Err(UserAdminError::Forbidden(actor.role));
        }

        match self.users.delete_user(id).await? {
            UserChangeOutcome::Deleted => {
                info!(
                    target = "sylheti_archive::admin::users",
                    user_id = %id,
                    actor = %actor.id,
                    "user deleted"
                );
                Ok(())
            }
            UserChangeOutcome::LastSuperadmin => {
                warn!(
                    target = "sylheti_archive::admin::users",
                    user_id = %id,
                    actor = %actor.id,
                    "refused to delete the last superadmin"
                );
                Err(UserAdminError::LastSuperadmin)
            }
            UserChangeOutcome::NotFound | UserChangeOutcome::Updated(_) => {
                Err(UserAdminError::NotFound)
            }
        }
    }
}
