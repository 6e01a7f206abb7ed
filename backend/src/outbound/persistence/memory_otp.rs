//! In-memory one-time code store.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::ports::{OtpRepository, PersistenceError};
use crate::domain::{EmailAddress, OtpChallenge, OtpPurpose};

/// Outstanding challenges keyed by email and purpose; a new challenge
/// replaces the previous one.
#[derive(Debug, Default)]
pub struct MemoryOtpRepository {
    challenges: DashMap<(EmailAddress, OtpPurpose), OtpChallenge>,
}

#[async_trait]
impl OtpRepository for MemoryOtpRepository {
    async fn store(&self, challenge: OtpChallenge) -> Result<(), PersistenceError> {
        self.challenges
            .insert((challenge.email.clone(), challenge.purpose), challenge);
        Ok(())
    }

    async fn find(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpChallenge>, PersistenceError> {
        Ok(self
            .challenges
            .get(&(email.clone(), purpose))
            .map(|entry| entry.value().clone()))
    }

    async fn remove(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
    ) -> Result<(), PersistenceError> {
        self.challenges.remove(&(email.clone(), purpose));
        Ok(())
    }
}
