//! AES-256-GCM transport cipher.
//!
//! Sealed text is `base64(nonce || ciphertext)` with a fresh 96-bit nonce per
//! call, so encrypting the same leaf twice yields different output.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::domain::ports::{CipherError, PayloadCipher};

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

/// Failure to load the transport key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CipherKeyError {
    /// The key material is neither 64 hex digits nor base64.
    #[error("encryption key is not valid hex or base64: {message}")]
    Encoding { message: String },
    /// The decoded key has the wrong length.
    #[error("encryption key must be 32 bytes, got {actual}")]
    Length { actual: usize },
}

/// Payload cipher sealing text with AES-256-GCM.
#[derive(Clone)]
pub struct AesGcmPayloadCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for AesGcmPayloadCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmPayloadCipher").finish_non_exhaustive()
    }
}

impl AesGcmPayloadCipher {
    /// Build a cipher from a 32-byte key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.into()),
        }
    }

    /// Build a cipher from key material encoded as 64 hex digits or base64.
    ///
    /// # Examples
    /// ```
    /// use stockdesk::outbound::crypto::AesGcmPayloadCipher;
    ///
    /// let hex_key = "00".repeat(32);
    /// assert!(AesGcmPayloadCipher::from_key_material(&hex_key).is_ok());
    /// assert!(AesGcmPayloadCipher::from_key_material("short").is_err());
    /// ```
    pub fn from_key_material(material: &str) -> Result<Self, CipherKeyError> {
        let key = parse_key(material.trim())?;
        Ok(Self::new(&key))
    }
}

fn parse_key(material: &str) -> Result<Zeroizing<[u8; KEY_SIZE]>, CipherKeyError> {
    let bytes = if material.len() == KEY_SIZE * 2 {
        hex::decode(material).map_err(|error| CipherKeyError::Encoding {
            message: error.to_string(),
        })?
    } else {
        BASE64
            .decode(material)
            .map_err(|error| CipherKeyError::Encoding {
                message: error.to_string(),
            })?
    };
    let bytes = Zeroizing::new(bytes);
    let mut key = Zeroizing::new([0_u8; KEY_SIZE]);
    if bytes.len() != KEY_SIZE {
        return Err(CipherKeyError::Length {
            actual: bytes.len(),
        });
    }
    key.copy_from_slice(&bytes);
    Ok(key)
}

impl PayloadCipher for AesGcmPayloadCipher {
    fn encrypt_text(&self, plain: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0_u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plain.as_bytes())
            .map_err(|error| CipherError::encrypt(error.to_string()))?;
        let mut framed = Vec::with_capacity(NONCE_SIZE + sealed.len());
        framed.extend_from_slice(&nonce_bytes);
        framed.extend_from_slice(&sealed);
        Ok(BASE64.encode(framed))
    }

    fn decrypt_text(&self, cipher: &str) -> Result<String, CipherError> {
        let framed = BASE64
            .decode(cipher.trim())
            .map_err(|error| CipherError::decrypt(format!("invalid base64: {error}")))?;
        if framed.len() <= NONCE_SIZE {
            return Err(CipherError::decrypt("sealed text is too short"));
        }
        let (nonce, sealed) = framed.split_at(NONCE_SIZE);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|error| CipherError::decrypt(error.to_string()))?;
        String::from_utf8(plain)
            .map_err(|error| CipherError::decrypt(format!("invalid UTF-8: {error}")))
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;

    #[fixture]
    fn cipher() -> AesGcmPayloadCipher {
        AesGcmPayloadCipher::new(&[7_u8; KEY_SIZE])
    }

    #[rstest]
    fn sealed_text_opens_with_the_same_key(cipher: AesGcmPayloadCipher) {
        let sealed = cipher.encrypt_text("hello").expect("encrypt");

        assert_ne!(sealed, "hello");
        assert_eq!(cipher.decrypt_text(&sealed).expect("decrypt"), "hello");
    }

    #[rstest]
    fn nonces_differ_between_calls(cipher: AesGcmPayloadCipher) {
        let first = cipher.encrypt_text("same").expect("encrypt");
        let second = cipher.encrypt_text("same").expect("encrypt");

        assert_ne!(first, second);
    }

    #[rstest]
    fn other_keys_cannot_open(cipher: AesGcmPayloadCipher) {
        let sealed = cipher.encrypt_text("secret").expect("encrypt");
        let other = AesGcmPayloadCipher::new(&[9_u8; KEY_SIZE]);

        assert!(other.decrypt_text(&sealed).is_err());
    }

    #[rstest]
    fn nested_payloads_keep_their_shape(cipher: AesGcmPayloadCipher) {
        let payload = json!({"data": {"id": 1, "tags": ["a", null], "ok": true}});

        let sealed = cipher.encrypt_nested(&payload).expect("encrypt");
        assert!(sealed["data"]["id"].is_string());
        assert!(sealed["data"]["tags"][1].is_null());

        assert_eq!(cipher.decrypt_nested(&sealed).expect("decrypt"), payload);
    }

    #[rstest]
    #[case::hex(&"ab".repeat(32))]
    #[case::base64("q6urq6urq6urq6urq6urq6urq6urq6urq6urq6urq6s=")]
    fn key_material_accepts_hex_and_base64(#[case] material: &str) {
        assert!(AesGcmPayloadCipher::from_key_material(material).is_ok());
    }

    #[rstest]
    fn short_keys_are_rejected() {
        let error = AesGcmPayloadCipher::from_key_material(&"ab".repeat(16)).expect_err("short");

        assert_eq!(error, CipherKeyError::Length { actual: 24 });
    }
}
