use std::str::FromStr;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use async_graphql::Enum;
use chrono::{Duration, Utc};
use entity::{user_profile, user_secret};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

pub const SESSION_COOKIE: &str = "se360_session";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub local_auth_enabled: bool,
    pub session_ttl_minutes: i64,
}

impl AuthConfig {
    pub fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.jwt_secret.as_bytes())
    }

    pub fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.jwt_secret.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub roles: Vec<String>,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Enum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum UserRole {
    Admin,
    Hr,
    Manager,
    Employee,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Hr => "HR",
            UserRole::Manager => "MANAGER",
            UserRole::Employee => "EMPLOYEE",
        }
    }

    pub fn level(self) -> u8 {
        match self {
            UserRole::Admin => 4,
            UserRole::Hr => 3,
            UserRole::Manager => 2,
            UserRole::Employee => 1,
        }
    }
}

impl FromStr for UserRole {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(UserRole::Admin),
            "HR" => Ok(UserRole::Hr),
            "MANAGER" => Ok(UserRole::Manager),
            "EMPLOYEE" => Ok(UserRole::Employee),
            _ => Err(ApiError::invalid("role", format!("Unknown role {}", value))),
        }
    }
}

impl From<user_profile::Role> for UserRole {
    fn from(value: user_profile::Role) -> Self {
        match value {
            user_profile::Role::Admin => UserRole::Admin,
            user_profile::Role::Hr => UserRole::Hr,
            user_profile::Role::Manager => UserRole::Manager,
            user_profile::Role::Employee => UserRole::Employee,
        }
    }
}

impl From<UserRole> for user_profile::Role {
    fn from(value: UserRole) -> Self {
        match value {
            UserRole::Admin => user_profile::Role::Admin,
            UserRole::Hr => user_profile::Role::Hr,
            UserRole::Manager => user_profile::Role::Manager,
            UserRole::Employee => user_profile::Role::Employee,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub roles: Vec<UserRole>,
}

impl CurrentUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.iter().any(|r| r.level() >= role.level())
    }

    pub fn highest_role(&self) -> Option<UserRole> {
        self.roles.iter().copied().max_by_key(|r| r.level())
    }

    pub fn require(&self, role: UserRole) -> ApiResult<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

pub fn issue_token(
    user_id: Uuid,
    roles: &[UserRole],
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<String> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(Duration::minutes(config.session_ttl_minutes))
        .unwrap_or(now)
        .timestamp() as usize;
    let claims = SessionClaims {
        sub: user_id,
        roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
        exp,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

pub fn decode_token(
    token: &str,
    config: &AuthConfig,
) -> jsonwebtoken::errors::Result<SessionClaims> {
    jsonwebtoken::decode::<SessionClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}

pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::internal(anyhow::anyhow!("hash error: {}", err)))
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(user_profile::Model),
    Rejected(&'static str),
}

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const ACCOUNT_DISABLED: &str = "Account disabled";

/// Checks an email/password pair against the stored argon2 secret.
pub async fn authenticate(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
) -> ApiResult<LoginOutcome> {
    let normalized = normalize_email(email);
    let Some(user) = user_profile::Entity::find()
        .filter(user_profile::Column::Email.eq(normalized))
        .one(db)
        .await?
    else {
        return Ok(LoginOutcome::Rejected(INVALID_CREDENTIALS));
    };
    let Some(secret) = user_secret::Entity::find_by_id(user.id).one(db).await? else {
        return Ok(LoginOutcome::Rejected(INVALID_CREDENTIALS));
    };
    if !verify_password(&secret.password_hash, password) {
        return Ok(LoginOutcome::Rejected(INVALID_CREDENTIALS));
    }
    if !user.is_active {
        return Ok(LoginOutcome::Rejected(ACCOUNT_DISABLED));
    }
    Ok(LoginOutcome::Authenticated(user))
}

/// Resolves verified token claims to a caller, skipping unknown or disabled accounts.
pub async fn resolve_session(
    db: &DatabaseConnection,
    claims: &SessionClaims,
) -> ApiResult<Option<CurrentUser>> {
    let user = user_profile::Entity::find_by_id(claims.sub).one(db).await?;
    Ok(user.filter(|u| u.is_active).map(|u| CurrentUser {
        user_id: u.id,
        roles: vec![UserRole::from(u.role)],
    }))
}
