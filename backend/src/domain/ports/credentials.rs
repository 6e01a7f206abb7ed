//! Ports for password hashing and bearer token handling.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{PasswordHash, User};

use super::define_port_error;

define_port_error! {
    /// Errors raised by the password hasher.
    pub enum CredentialError {
        /// Hashing or verification could not run.
        Hashing { message: String } => "password hashing failed: {message}",
        /// The stored hash is not in a recognised format.
        MalformedHash { message: String } => "stored password hash is malformed: {message}",
    }
}

define_port_error! {
    /// Errors raised while issuing or verifying bearer tokens.
    pub enum TokenError {
        /// Token could not be signed.
        Signing { message: String } => "token signing failed: {message}",
        /// Token is malformed, forged or expired.
        Invalid { message: String } => "token rejected: {message}",
    }
}

/// Slow one-way hashing of secrets.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Hash `secret` with a fresh salt.
    fn hash(&self, secret: &str) -> Result<PasswordHash, CredentialError>;

    /// Whether `secret` matches `hash`.
    fn verify(&self, secret: &str, hash: &PasswordHash) -> Result<bool, CredentialError>;
}

/// Claims embedded in an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject user id.
    pub sub: u64,
    /// Subject email at issue time.
    pub email: String,
    /// Token version; tokens with an older version than the account are
    /// revoked.
    pub ver: u32,
    /// Issued-at, seconds since the epoch.
    pub iat: i64,
    /// Expiry, seconds since the epoch.
    pub exp: i64,
}

/// Issue and verify signed access tokens.
#[cfg_attr(test, mockall::automock)]
pub trait TokenIssuer: Send + Sync {
    /// Sign an access token for `user` issued at `now`.
    fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, TokenError>;

    /// Verify `token` and return its claims.
    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError>;
}
