//! Login, registration and bearer token resolution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use super::ports::TokenIssuer;
use super::{
    EmailAddress, Error, ErrorCode, Freshness, LoginCredentials, NewUserDraft, OperationResult,
    PasswordPolicy, PersonName, Principal, User, UserId, UserService, UserType,
};

const LOGIN_FAILED: &str = "Incorrect email/password";

/// Successful login or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoginOutcome {
    /// Bearer token for subsequent requests.
    pub access_token: String,
    /// Account email.
    pub email: EmailAddress,
    /// Display name.
    pub full_name: String,
}

/// Self-service signup input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Given name.
    pub first_name: PersonName,
    /// Family name.
    pub last_name: PersonName,
    /// Login address.
    pub email: EmailAddress,
    /// Optional contact number.
    pub phone: Option<String>,
    /// Chosen password, checked against [`PasswordPolicy::SIGNUP`].
    pub password: String,
}

/// Authentication operations layered over [`UserService`].
#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    tokens: Arc<dyn TokenIssuer>,
}

impl AuthService {
    /// Create a service issuing tokens through `tokens`.
    pub fn new(users: UserService, tokens: Arc<dyn TokenIssuer>) -> Self {
        Self { users, tokens }
    }

    /// Account service the authentication flows run against.
    pub fn users(&self) -> &UserService {
        &self.users
    }

    /// Check credentials and issue a token.
    ///
    /// Unknown accounts, inactive accounts and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn login(&self, credentials: LoginCredentials) -> OperationResult<LoginOutcome> {
        let Some(mut user) = self.users.load_by_email(credentials.email()).await? else {
            debug!("login attempt for unknown email");
            return Err(Error::field("email", LOGIN_FAILED));
        };
        if !user.can_log_in() || !self.users.verify_password(&user, credentials.password())? {
            debug!(user_id = %user.id, "login rejected");
            return Err(Error::field("email", LOGIN_FAILED));
        }
        user.last_login = Some(self.users.now());
        self.users.persist(&user).await?;
        info!(user_id = %user.id, "user logged in");
        self.outcome_for(&user)
    }

    /// Create a regular account and log it in.
    pub async fn register(&self, registration: Registration) -> OperationResult<LoginOutcome> {
        PasswordPolicy::SIGNUP
            .check(&registration.password)
            .map_err(|message| Error::field("password", message))?;
        let user = self
            .users
            .create_single(
                None,
                NewUserDraft {
                    first_name: registration.first_name,
                    last_name: registration.last_name,
                    email: registration.email,
                    phone: registration.phone,
                    user_type: UserType::RegularUser,
                    password: registration.password,
                },
            )
            .await?;
        self.outcome_for(&user)
    }

    /// Revoke every token issued to the caller.
    pub async fn logout(&self, principal: &Principal) -> OperationResult<()> {
        let mut user = self.users.load_live(principal.user_id).await?;
        user.token_version = user.token_version.wrapping_add(1);
        user.updated_at = self.users.now();
        self.users.persist(&user).await?;
        info!(user_id = %user.id, "user logged out");
        Ok(())
    }

    /// Issue a fresh token for an authenticated caller.
    ///
    /// The caller's token version is left untouched, so earlier tokens stay
    /// valid until they expire or the account logs out.
    pub async fn refresh(&self, principal: &Principal) -> OperationResult<LoginOutcome> {
        let user = self.users.load_live(principal.user_id).await?;
        if !user.can_log_in() {
            return Err(Error::unauthorized("Invalid token"));
        }
        debug!(user_id = %user.id, "token refreshed");
        self.outcome_for(&user)
    }

    /// Resolve the caller behind a bearer token.
    ///
    /// The token must verify, name a live account that may log in, and carry
    /// that account's current token version.
    pub async fn resolve_principal(&self, token: &str) -> OperationResult<Principal> {
        let claims = self.tokens.verify(token).map_err(|error| {
            debug!(%error, "bearer token rejected");
            Error::unauthorized("Invalid token")
        })?;
        let id = UserId::new(claims.sub);
        let user = self
            .users
            .cached_by_id(id, Freshness::AllowCached)
            .await
            .map_err(|error| match error.code() {
                ErrorCode::InternalError => error,
                _ => Error::unauthorized("Invalid token"),
            })?;
        if user.token_version != claims.ver || !user.can_log_in() {
            return Err(Error::unauthorized("Invalid token"));
        }
        self.users.resolve_principal(id, Freshness::AllowCached).await
    }

    fn outcome_for(&self, user: &User) -> OperationResult<LoginOutcome> {
        let access_token = self.tokens.issue(user, self.users.now())?;
        Ok(LoginOutcome {
            access_token,
            email: user.email.clone(),
            full_name: user.full_name(),
        })
    }
}

#[cfg(test)]
#[path = "auth_service_tests.rs"]
mod tests;
