//! Argon2id implementation of the `PasswordHasher` port.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{
    PasswordHash as PhcHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
};

use crate::domain::PasswordHash;
use crate::domain::ports::{CredentialError, PasswordHasher};

/// Hashes secrets into PHC strings with Argon2id default parameters.
#[derive(Debug, Clone, Default)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher for Argon2PasswordHasher {
    fn hash(&self, secret: &str) -> Result<PasswordHash, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|phc| PasswordHash::new(phc.to_string()))
            .map_err(|error| CredentialError::hashing(error.to_string()))
    }

    fn verify(&self, secret: &str, hash: &PasswordHash) -> Result<bool, CredentialError> {
        let parsed = PhcHash::new(hash.as_str())
            .map_err(|error| CredentialError::malformed_hash(error.to_string()))?;
        Ok(self
            .argon2
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn hashes_verify_only_the_original_secret() {
        let hasher = Argon2PasswordHasher::default();
        let hash = hasher.hash("Corr3ct!horse").expect("hash");

        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(hasher.verify("Corr3ct!horse", &hash).expect("verify"));
        assert!(!hasher.verify("wrong", &hash).expect("verify"));
    }

    #[rstest]
    fn malformed_hashes_are_errors() {
        let hasher = Argon2PasswordHasher::default();

        let error = hasher
            .verify("anything", &PasswordHash::new("plain-text"))
            .expect_err("malformed");

        assert!(matches!(error, CredentialError::MalformedHash { .. }));
    }
}
