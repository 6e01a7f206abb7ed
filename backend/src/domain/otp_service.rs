//! One-time code flows for signup verification and password resets.

use std::sync::Arc;

use chrono::TimeDelta;
use rand::Rng;
use tracing::{debug, info, warn};

use super::ports::{OtpNotifier, OtpRepository, PasswordHasher};
use super::{
    EmailAddress, Error, ErrorCode, OTP_LENGTH, OperationResult, OtpChallenge, OtpPurpose,
    PasswordPolicy, User, UserService,
};

const INVALID_CODE: &str = "Invalid or expired OTP";
const DEVELOPMENT_CODE: &str = "123456";

/// Tunables for code issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpSettings {
    /// How long an issued code stays valid.
    pub ttl: TimeDelta,
    /// Issue the fixed development code instead of a random one.
    pub debug_otp: bool,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            ttl: TimeDelta::minutes(10),
            debug_otp: false,
        }
    }
}

/// Issues and redeems one-time codes.
#[derive(Clone)]
pub struct OtpService {
    users: UserService,
    challenges: Arc<dyn OtpRepository>,
    notifier: Arc<dyn OtpNotifier>,
    hasher: Arc<dyn PasswordHasher>,
    settings: OtpSettings,
}

impl OtpService {
    /// Create a service storing hashed codes in `challenges`.
    pub fn new(
        users: UserService,
        challenges: Arc<dyn OtpRepository>,
        notifier: Arc<dyn OtpNotifier>,
        hasher: Arc<dyn PasswordHasher>,
        settings: OtpSettings,
    ) -> Self {
        Self {
            users,
            challenges,
            notifier,
            hasher,
            settings,
        }
    }

    /// Issue a fresh code for `email`, replacing any outstanding one.
    pub async fn request_otp(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
    ) -> OperationResult<()> {
        let user = self.account(email).await?;
        if purpose == OtpPurpose::SignupVerification && user.email_verified {
            return Err(Error::invalid_request("Email is already verified"));
        }
        let code = self.generate_code();
        let challenge = OtpChallenge {
            email: email.clone(),
            purpose,
            code_hash: self.hasher.hash(&code)?,
            expires_at: self.users.now() + self.settings.ttl,
            failed_attempts: 0,
        };
        self.challenges.store(challenge).await?;
        self.notifier.send(email, purpose, &code).await?;
        info!(user_id = %user.id, purpose = purpose.as_str(), "one-time code issued");
        Ok(())
    }

    /// Issue a password reset code.
    ///
    /// Unknown addresses succeed silently so callers cannot discover which
    /// accounts exist.
    pub async fn request_password_reset(&self, email: &EmailAddress) -> OperationResult<()> {
        match self.request_otp(email, OtpPurpose::PasswordReset).await {
            Err(error) if error.code() == ErrorCode::NotFound => {
                debug!("password reset requested for unknown account");
                Ok(())
            }
            outcome => outcome,
        }
    }

    /// Redeem a signup code and mark the account's email verified.
    pub async fn verify_signup_otp(
        &self,
        email: &EmailAddress,
        code: &str,
    ) -> OperationResult<()> {
        let mut user = self.account(email).await?;
        self.redeem(email, OtpPurpose::SignupVerification, code).await?;
        user.email_verified = true;
        user.updated_at = self.users.now();
        self.users.persist(&user).await?;
        info!(user_id = %user.id, "email verified");
        Ok(())
    }

    /// Redeem a reset code and replace the password, revoking every token.
    pub async fn reset_password(
        &self,
        email: &EmailAddress,
        code: &str,
        new_password: &str,
    ) -> OperationResult<()> {
        PasswordPolicy::RESET
            .check(new_password)
            .map_err(|message| Error::field("password", message))?;
        let mut user = self.account(email).await?;
        self.redeem(email, OtpPurpose::PasswordReset, code).await?;
        user.password_hash = self.users.hash_password(new_password)?;
        user.token_version = user.token_version.wrapping_add(1);
        user.updated_at = self.users.now();
        self.users.persist(&user).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    async fn account(&self, email: &EmailAddress) -> OperationResult<User> {
        self.users
            .load_by_email(email)
            .await?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    async fn redeem(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
        code: &str,
    ) -> OperationResult<()> {
        let Some(mut challenge) = self.challenges.find(email, purpose).await? else {
            debug!(purpose = purpose.as_str(), "no outstanding code");
            return Err(Error::invalid_request(INVALID_CODE));
        };
        if !challenge.is_live_at(self.users.now()) {
            self.challenges.remove(email, purpose).await?;
            return Err(Error::invalid_request(INVALID_CODE));
        }
        if !self.hasher.verify(code.trim(), &challenge.code_hash)? {
            if challenge.record_failure() {
                warn!(purpose = purpose.as_str(), "one-time code discarded after failed attempts");
                self.challenges.remove(email, purpose).await?;
            } else {
                self.challenges.store(challenge).await?;
            }
            return Err(Error::invalid_request(INVALID_CODE));
        }
        self.challenges.remove(email, purpose).await?;
        Ok(())
    }

    fn generate_code(&self) -> String {
        if self.settings.debug_otp {
            return DEVELOPMENT_CODE.to_owned();
        }
        let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
        format!("{code:0width$}", width = OTP_LENGTH)
    }
}

#[cfg(test)]
#[path = "otp_service_tests.rs"]
mod tests;
