//! User accounts and the values they are built from.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::UserId;

/// Validation errors raised by user value constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserValidationError {
    /// The email address is empty or malformed.
    #[error("Enter a valid email address.")]
    InvalidEmail,
    /// A name is empty once trimmed.
    #[error("This field may not be blank.")]
    BlankName,
    /// A name exceeds the stored column width.
    #[error("Ensure this field has no more than {max} characters.")]
    NameTooLong {
        /// Maximum accepted length.
        max: usize,
    },
}

/// Maximum length of first and last names.
pub const NAME_MAX: usize = 150;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Normalised email address: trimmed and lower-cased.
///
/// # Examples
/// ```
/// use stockdesk::domain::EmailAddress;
///
/// let email = EmailAddress::new("  Ada@Example.COM ").expect("valid email");
/// assert_eq!(email.as_ref(), "ada@example.com");
/// assert!(EmailAddress::new("ada").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "ada@example.com")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and normalise an email address.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if !email_regex().is_match(&normalised) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Trimmed, non-blank personal name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "Ada")]
pub struct PersonName(String);

impl PersonName {
    /// Validate a first or last name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::BlankName);
        }
        if trimmed.chars().count() > NAME_MAX {
            return Err(UserValidationError::NameTooLong { max: NAME_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for PersonName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PersonName> for String {
    fn from(value: PersonName) -> Self {
        value.0
    }
}

/// Account category used by coarse-grained authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum UserType {
    /// Operator with access to every tenant resource.
    #[serde(rename = "Super Admin")]
    SuperAdmin,
    /// Self-registered customer.
    #[serde(rename = "Regular User")]
    RegularUser,
}

/// Stored password hash in PHC string format.
///
/// `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a PHC-formatted hash.
    pub fn new(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    /// PHC string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Persisted user account.
///
/// Deletion is soft: `deleted_at` is set and the row stays in storage so
/// audit references remain valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Primary key.
    pub id: UserId,
    /// Given name.
    pub first_name: PersonName,
    /// Family name.
    pub last_name: PersonName,
    /// Unique login email.
    pub email: EmailAddress,
    /// Optional contact number.
    pub phone: Option<String>,
    /// Account category.
    pub user_type: UserType,
    /// Role (group) names granted to the account.
    pub roles: Vec<String>,
    /// Named permissions granted directly or through roles.
    pub permissions: Vec<String>,
    /// Disabled accounts cannot log in.
    pub is_active: bool,
    /// Set once the signup one-time code has been confirmed.
    pub email_verified: bool,
    /// Argon2 hash of the password.
    pub password_hash: PasswordHash,
    /// Incremented to revoke every outstanding access token.
    pub token_version: u32,
    /// Last successful login.
    pub last_login: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Account that created this one, when created by an operator.
    pub created_by: Option<UserId>,
    /// Soft deletion time.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Account that performed the soft deletion.
    pub deleted_by: Option<UserId>,
}

impl User {
    /// `"first last"`.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.as_ref(), self.last_name.as_ref())
    }

    /// Whether the account is an operator.
    pub fn is_super_admin(&self) -> bool {
        self.user_type == UserType::SuperAdmin
    }

    /// Whether the account has been soft deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Active and not deleted.
    pub fn can_log_in(&self) -> bool {
        self.is_active && !self.is_deleted()
    }
}

/// Fields required to create a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Given name.
    pub first_name: PersonName,
    /// Family name.
    pub last_name: PersonName,
    /// Login email.
    pub email: EmailAddress,
    /// Optional contact number.
    pub phone: Option<String>,
    /// Account category.
    pub user_type: UserType,
    /// Hash of the initial password.
    pub password_hash: PasswordHash,
    /// Creating operator, if any.
    pub created_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    /// Materialise the stored account under `id`.
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            user_type: self.user_type,
            roles: Vec::new(),
            permissions: Vec::new(),
            is_active: true,
            email_verified: false,
            password_hash: self.password_hash,
            token_version: 0,
            last_login: None,
            created_at: self.created_at,
            updated_at: self.created_at,
            created_by: self.created_by,
            deleted_at: None,
            deleted_by: None,
        }
    }
}

/// Keyword filter and ordering for user listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListFilter {
    /// Case-insensitive match on first name, last name or email.
    pub keyword: Option<String>,
    /// Account excluded from the listing, usually the caller.
    pub exclude: Option<UserId>,
}

impl UserListFilter {
    /// Whether `user` passes the filter. Deleted users never do.
    pub fn matches(&self, user: &User) -> bool {
        if user.is_deleted() || self.exclude == Some(user.id) {
            return false;
        }
        let Some(keyword) = self.keyword.as_deref().map(str::to_lowercase) else {
            return true;
        };
        [
            user.first_name.as_ref(),
            user.last_name.as_ref(),
            user.email.as_ref(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&keyword))
    }
}

#[cfg(test)]
mod tests;
