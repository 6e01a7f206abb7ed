//! Authentication primitives: credentials, password rules, principals and
//! one-time codes.
//!
//! Inbound adapters build these values from request payloads before calling
//! the auth services, so services never see unvalidated strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::{EmailAddress, PasswordHash, User, UserId, UserType};

/// Validated login credentials.
///
/// The password keeps caller-provided whitespace and is zeroed on drop.
///
/// # Examples
/// ```
/// use stockdesk::domain::{EmailAddress, LoginCredentials};
///
/// let email = EmailAddress::new("ada@example.com").expect("email");
/// let creds = LoginCredentials::new(email, "s3cret!");
/// assert_eq!(creds.password(), "s3cret!");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: EmailAddress,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Pair an email with a plaintext password.
    pub fn new(email: EmailAddress, password: impl Into<String>) -> Self {
        Self {
            email,
            password: Zeroizing::new(password.into()),
        }
    }

    /// Login email.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Plaintext password.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Strength rule applied to new passwords.
///
/// Every policy requires an upper-case letter, a lower-case letter, a digit
/// and a symbol; policies differ in minimum length and failure message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    min_length: usize,
    message: &'static str,
}

impl PasswordPolicy {
    /// Rule for passwords chosen at signup or by an operator.
    pub const SIGNUP: Self = Self {
        min_length: 8,
        message: "Password is too weak",
    };

    /// Stricter rule for passwords set through a reset or change.
    pub const RESET: Self = Self {
        min_length: 12,
        message: "Insecure Password",
    };

    /// Minimum number of characters.
    pub const fn min_length(&self) -> usize {
        self.min_length
    }

    /// Check `password`, returning the policy message on failure.
    ///
    /// # Examples
    /// ```
    /// use stockdesk::domain::PasswordPolicy;
    ///
    /// assert!(PasswordPolicy::SIGNUP.check("Str0ng!pw").is_ok());
    /// assert_eq!(PasswordPolicy::SIGNUP.check("weak"), Err("Password is too weak"));
    /// ```
    pub fn check(&self, password: &str) -> Result<(), &'static str> {
        let long_enough = password.chars().count() >= self.min_length;
        let upper = password.chars().any(char::is_uppercase);
        let lower = password.chars().any(char::is_lowercase);
        let digit = password.chars().any(|c| c.is_ascii_digit());
        let symbol = password
            .chars()
            .any(|c| !c.is_alphanumeric() && !c.is_whitespace());
        if long_enough && upper && lower && digit && symbol {
            Ok(())
        } else {
            Err(self.message)
        }
    }
}

/// Authenticated caller resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account identifier.
    pub user_id: UserId,
    /// Account email.
    pub email: EmailAddress,
    /// Account category.
    pub user_type: UserType,
    /// Granted role names.
    pub roles: Vec<String>,
    /// Granted permission names.
    pub permissions: Vec<String>,
}

impl Principal {
    /// Snapshot the authorization-relevant parts of `user`.
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            user_type: user.user_type,
            roles: user.roles.clone(),
            permissions: user.permissions.clone(),
        }
    }

    /// Whether the caller is an operator.
    pub fn is_super_admin(&self) -> bool {
        self.user_type == UserType::SuperAdmin
    }

    /// Whether the caller holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Whether the caller holds `permission`.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Whether the caller may act on resources owned by `owner`.
    pub fn may_act_for(&self, owner: UserId) -> bool {
        self.user_id == owner || self.is_super_admin()
    }
}

/// Purpose a one-time code was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    /// Confirms ownership of the signup email.
    SignupVerification,
    /// Authorises a password reset.
    PasswordReset,
}

impl OtpPurpose {
    /// Stable label used in storage keys and log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignupVerification => "signup_verification",
            Self::PasswordReset => "password_reset",
        }
    }
}

/// Number of digits in a one-time code.
pub const OTP_LENGTH: usize = 6;

/// Wrong submissions tolerated before a challenge is discarded.
pub const OTP_MAX_ATTEMPTS: u32 = 5;

/// Outstanding one-time code awaiting confirmation.
///
/// Only the hash of the code is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    /// Address the code was sent to.
    pub email: EmailAddress,
    /// Flow the code belongs to.
    pub purpose: OtpPurpose,
    /// Hash of the code.
    pub code_hash: PasswordHash,
    /// Instant after which the code is rejected.
    pub expires_at: DateTime<Utc>,
    /// Wrong codes submitted so far.
    pub failed_attempts: u32,
}

impl OtpChallenge {
    /// Whether the challenge can still be redeemed at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at && self.failed_attempts < OTP_MAX_ATTEMPTS
    }

    /// Count a wrong submission, returning `true` once the challenge is spent.
    pub const fn record_failure(&mut self) -> bool {
        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.failed_attempts >= OTP_MAX_ATTEMPTS
    }
}
