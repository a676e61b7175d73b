use crate::error::app_error::AppError;
use crate::service::password::PasswordHasher;
use chrono::{DateTime, Utc};
use regex::Regex;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use std::sync::LazyLock;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("valid phone regex"));

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Eq, PartialEq, Default, JsonSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "account_role", rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Editor,
}

/// A stored admin-console identity.
///
/// Deliberately not `Serialize`: callers outside the store get an
/// [`AccountResponse`], which carries no credential material.
#[derive(Clone, PartialEq, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub failed_attempt_count: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("failed_attempt_count", &self.failed_attempt_count)
            .field("locked_until", &self.locked_until)
            .field("last_login_at", &self.last_login_at)
            .finish()
    }
}

impl Account {
    /// Validates the request, hashes its password and builds the account value.
    pub fn create(request: &NewAccount, hasher: &PasswordHasher, now: DateTime<Utc>) -> Result<Self, AppError> {
        let request = NewAccount {
            name: request.name.trim().to_string(),
            email: normalize_email(&request.email),
            phone: request.phone.as_ref().map(|phone| phone.trim().to_string()),
            ..request.clone()
        };
        request.validate()?;
        let password_hash = hasher.hash(&request.password)?;

        Ok(Self {
            id: Uuid::new_v4(),
            name: request.name,
            email: request.email,
            phone: request.phone,
            password_hash,
            role: request.role,
            is_active: true,
            failed_attempt_count: 0,
            locked_until: None,
            last_login_at: None,
            created_at: now,
        })
    }

    /// Email comparison ignores case and surrounding whitespace.
    pub fn matches_email(&self, identifier: &str) -> bool {
        self.email == normalize_email(identifier)
    }

    pub fn matches_phone(&self, identifier: &str) -> bool {
        self.phone.as_deref() == Some(identifier.trim())
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Deserialize, Validate, JsonSchema, Clone)]
pub struct NewAccount {
    #[validate(length(min = 2, max = 50))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "crate::models::account::validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(min = 8))]
    #[validate(custom(function = "crate::models::account::validate_password_strength"))]
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE_PATTERN.is_match(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("phone_format").with_message("phone must be exactly 10 digits".into()))
    }
}

pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let entropy = zxcvbn::zxcvbn(password, &[]);
    if entropy.score() < zxcvbn::Score::Three {
        return Err(ValidationError::new("password_strength").with_message("password is too easy to guess".into()));
    }
    Ok(())
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginRequest {
    /// Email address or 10-digit phone number.
    #[validate(length(min = 1, max = 254))]
    pub identifier: String,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest").field("identifier", &self.identifier).finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct AccountResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            role: account.role,
            is_active: account.is_active,
            last_login_at: account.last_login_at,
        }
    }
}
