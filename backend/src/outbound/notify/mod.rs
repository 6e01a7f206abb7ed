//! One-time code delivery.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{OtpDeliveryError, OtpNotifier};
use crate::domain::{EmailAddress, OtpPurpose};

/// Notifier that writes codes to the log instead of sending mail.
///
/// Only the development build logs the code itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingOtpNotifier;

#[async_trait]
impl OtpNotifier for LoggingOtpNotifier {
    async fn send(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
        code: &str,
    ) -> Result<(), OtpDeliveryError> {
        if cfg!(debug_assertions) {
            info!(%email, purpose = purpose.as_str(), code, "one-time code ready");
        } else {
            info!(%email, purpose = purpose.as_str(), "one-time code ready");
        }
        Ok(())
    }
}
