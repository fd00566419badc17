//! Dashboard users: password login, signed session tokens and role checks.

use std::{sync::Arc, time::Duration};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind as JwtErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    application::repos::{CreateUserParams, RepoError, UsersRepo},
    domain::{entities::UserRecord, error::DomainError, permissions::Permission, types::Role},
};

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 64;
pub const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("session token is invalid")]
    InvalidToken,
    #[error("session token has expired")]
    Expired,
    #[error("missing permission `{}`", .permission.as_str())]
    Forbidden { permission: Permission },
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("username `{0}` is already taken")]
    UsernameTaken(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token signing failed: {0}")]
    Token(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: Uuid,
    username: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Authenticated dashboard user attached to requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthPrincipal {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl AuthPrincipal {
    pub fn new(user_id: Uuid, username: String, role: Role) -> Self {
        Self {
            user_id,
            username,
            permissions: role.permissions(),
            role,
        }
    }

    pub fn can(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn requires(&self, permission: Permission) -> Result<(), AuthError> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(AuthError::Forbidden { permission })
        }
    }
}

/// User as exposed over the API (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login_at: Option<OffsetDateTime>,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: AuthPrincipal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserCommand {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(users: Arc<dyn UsersRepo>, secret: &str, token_ttl: Duration) -> Self {
        Self {
            users,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let user = self
            .users
            .find_by_username(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            warn!(
                target = "peoples_thread::application::auth",
                username = %user.username,
                "rejected login"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let now = OffsetDateTime::now_utc();
        self.users.touch_last_login(user.id, now).await?;

        let principal = AuthPrincipal::new(user.id, user.username.clone(), user.role);
        let (token, expires_at) = self.issue(&principal, now)?;
        info!(
            target = "peoples_thread::application::auth",
            user_id = %user.id,
            role = %user.role,
            "user logged in"
        );

        Ok(LoginOutcome {
            token,
            expires_at,
            user: principal,
        })
    }

    fn issue(
        &self,
        principal: &AuthPrincipal,
        now: OffsetDateTime,
    ) -> Result<(String, OffsetDateTime), AuthError> {
        let expires_at = now + self.token_ttl;
        let claims = Claims {
            sub: principal.user_id,
            username: principal.username.clone(),
            role: principal.role,
            iat: now.unix_timestamp(),
            exp: expires_at.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| AuthError::Token(err.to_string()))?;
        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<AuthPrincipal, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            match err.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            }
        })?;
        let claims = data.claims;
        Ok(AuthPrincipal::new(claims.sub, claims.username, claims.role))
    }

    pub async fn create_user(&self, command: CreateUserCommand) -> Result<UserRecord, AuthError> {
        let username = validate_username(&command.username)?;
        let email = validate_email(&command.email)?;
        validate_password(&command.password)?;

        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameTaken(username));
        }

        let params = CreateUserParams {
            username: username.clone(),
            email,
            password_hash: hash_password(&command.password)?,
            role: command.role,
        };

        let user = self.users.create_user(params).await.map_err(|err| match err {
            RepoError::Duplicate { .. } => AuthError::UsernameTaken(username),
            other => other.into(),
        })?;
        info!(
            target = "peoples_thread::application::auth",
            user_id = %user.id,
            username = %user.username,
            role = %user.role,
            "user created"
        );
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<UserSummary>, AuthError> {
        let users = self.users.list_users().await?;
        Ok(users.iter().map(UserSummary::from).collect())
    }

    /// Seed the first admin when the user collection is empty.
    pub async fn bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserRecord>, AuthError> {
        if self.users.count_users().await? > 0 {
            return Ok(None);
        }

        let user = self
            .create_user(CreateUserCommand {
                username: username.to_string(),
                email: format!("{}@localhost", username.trim().to_lowercase()),
                password: password.to_string(),
                role: Role::Admin,
            })
            .await?;
        info!(
            target = "peoples_thread::application::auth",
            username = %user.username,
            "bootstrap admin created"
        );
        Ok(Some(user))
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|err| AuthError::Hash(err.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Hash(err.to_string()))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored).map_err(|err| AuthError::Hash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn validate_username(username: &str) -> Result<String, DomainError> {
    let username = username.trim();
    let len = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
        return Err(DomainError::validation(
            "username",
            format!(
                "username must be between {USERNAME_MIN_CHARS} and {USERNAME_MAX_CHARS} characters"
            ),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(DomainError::validation(
            "username",
            "username may contain letters, digits, `_`, `.` and `-`",
        ));
    }
    Ok(username.to_string())
}

fn validate_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_string()),
        _ => Err(DomainError::validation("email", "email address is invalid")),
    }
}

fn validate_password(password: &str) -> Result<(), DomainError> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(DomainError::validation(
            "password",
            format!("password must be at least {PASSWORD_MIN_CHARS} characters"),
        ));
    }
    Ok(())
}
