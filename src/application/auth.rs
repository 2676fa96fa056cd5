//! Accounts, password hashing and signed session tokens.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::entities::UserRecord;
use crate::domain::types::Role;
use crate::domain::workflow::Actor;

pub const SESSION_COOKIE: &str = "token";
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    ConstraintViolation(&'static str),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account role `{}` cannot use this sign-in", .0.as_str())]
    InsufficientRole(Role),
    #[error("session token is invalid or expired")]
    InvalidToken,
    #[error("an account with this email or username already exists")]
    AccountExists,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("session signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for AuthError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate { .. } => AuthError::AccountExists,
            other => AuthError::Repo(other),
        }
    }
}

/// The authenticated caller resolved from a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("role `{}` lacks required role `{}`", .actual.as_str(), .required.as_str())]
pub struct AccessDenied {
    pub required: Role,
    pub actual: Role,
}

impl Principal {
    pub fn requires(&self, role: Role) -> Result<(), AccessDenied> {
        if self.role.satisfies(role) {
            Ok(())
        } else {
            Err(AccessDenied {
                required: role,
                actual: self.role,
            })
        }
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub max_age: Duration,
}

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::default(),
            ttl,
        }
    }

    pub fn issue(&self, user: &UserRecord) -> Result<SessionToken, AuthError> {
        let now = OffsetDateTime::now_utc();
        let expires_at = now + self.ttl;
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(SessionToken {
            token,
            expires_at,
            max_age: self.ttl,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(Principal {
            user_id: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hash(err.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|err| AuthError::Hash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Run an Argon2 operation on the blocking thread pool.
async fn run_blocking<T, F>(f: F) -> Result<T, AuthError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| AuthError::Hash(format!("hashing task failed: {err}")))?
}

pub async fn hash_password_async(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    run_blocking(move || hash_password(&password)).await
}

pub async fn verify_password_async(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();
    run_blocking(move || verify_password(&password, &hash)).await
}

#[derive(Debug, Clone)]
pub struct SignupCommand {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SigninCommand {
    pub email: String,
    pub password: String,
}

/// Validated, normalised account fields.
pub struct AccountFields {
    pub username: String,
    pub email: String,
}

pub fn normalize_account(username: &str, email: &str) -> Result<AccountFields, AuthError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AuthError::ConstraintViolation("username"));
    }
    let email = normalize_email(email)?;
    Ok(AccountFields {
        username: username.to_string(),
        email,
    })
}

pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_ascii_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(email)
    } else {
        Err(AuthError::ConstraintViolation("email"))
    }
}

pub fn ensure_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::ConstraintViolation("password"));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    sessions: SessionIssuer,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, sessions: SessionIssuer) -> Self {
        Self { users, sessions }
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Self-service registration. New accounts are always VIEWERs.
    pub async fn signup(
        &self,
        command: SignupCommand,
    ) -> Result<(UserRecord, SessionToken), AuthError> {
        let fields = normalize_account(&command.username, &command.email)?;
        ensure_password(&command.password)?;
        let password_hash = hash_password_async(&command.password).await?;

        let user = self
            .users
            .create_user(CreateUserParams {
                username: fields.username,
                email: fields.email,
                password_hash,
                role: Role::Viewer,
            })
            .await?;

        let token = self.sessions.issue(&user)?;
        Ok((user, token))
    }

    /// Verify credentials; `minimum` gates the admin sign-in.
    pub async fn signin(
        &self,
        command: SigninCommand,
        minimum: Option<Role>,
    ) -> Result<(UserRecord, SessionToken), AuthError> {
        let email = normalize_email(&command.email).map_err(|_| AuthError::InvalidCredentials)?;
        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password_async(&command.password, &user.password_hash).await? {
            return Err(AuthError::InvalidCredentials);
        }

        if minimum.is_some_and(|required| !user.role.satisfies(required)) {
            return Err(AuthError::InsufficientRole(user.role));
        }

        let token = self.sessions.issue(&user)?;
        Ok((user, token))
    }

    /// Resolve the stored account behind a session.
    pub async fn current_user(&self, principal: &Principal) -> Result<UserRecord, AuthError> {
        self.users
            .find_user(principal.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Create a SUPERADMIN from the command line.
    pub async fn bootstrap_superadmin(
        &self,
        command: SignupCommand,
    ) -> Result<UserRecord, AuthError> {
        let fields = normalize_account(&command.username, &command.email)?;
        ensure_password(&command.password)?;
        let password_hash = hash_password_async(&command.password).await?;

        self.users
            .create_user(CreateUserParams {
                username: fields.username,
                email: fields.email,
                password_hash,
                role: Role::Superadmin,
            })
            .await
            .map_err(AuthError::from)
    }
}
