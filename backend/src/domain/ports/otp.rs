//! Ports for one-time code storage and delivery.
use async_trait::async_trait;

use crate::domain::{EmailAddress, OtpChallenge, OtpPurpose};

use super::{PersistenceError, define_port_error};

define_port_error! {
    /// Errors raised while delivering a one-time code.
    pub enum OtpDeliveryError {
        /// The delivery channel refused or dropped the message.
        Delivery { message: String } => "one-time code delivery failed: {message}",
    }
}

/// Storage of outstanding one-time codes, one per email and purpose.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Store `challenge`, replacing any outstanding code for the same email
    /// and purpose.
    async fn store(&self, challenge: OtpChallenge) -> Result<(), PersistenceError>;

    /// Fetch the outstanding code for `email` and `purpose`.
    async fn find(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpChallenge>, PersistenceError>;

    /// Discard the outstanding code for `email` and `purpose`.
    async fn remove(&self, email: &EmailAddress, purpose: OtpPurpose)
    -> Result<(), PersistenceError>;
}

/// Out-of-band delivery of one-time codes (email, SMS).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpNotifier: Send + Sync {
    /// Send `code` to `email` for `purpose`.
    async fn send(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<(), OtpDeliveryError>;
}
