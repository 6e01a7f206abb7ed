//! Port for transport-level payload encryption.
//!
//! Adapters implement text encryption; the provided methods walk JSON trees
//! so every scalar leaf is encrypted on its own while keys and structure stay
//! readable.
use serde_json::{Map, Value};

use super::define_port_error;

define_port_error! {
    /// Errors raised by the payload cipher.
    pub enum CipherError {
        /// Encryption could not run.
        Encrypt { message: String } => "payload encryption failed: {message}",
        /// Ciphertext is malformed or fails authentication.
        Decrypt { message: String } => "payload decryption failed: {message}",
    }
}

/// Symmetric cipher applied to request and response bodies.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use stockdesk::domain::ports::{CipherError, PayloadCipher};
///
/// struct Reverse;
///
/// impl PayloadCipher for Reverse {
///     fn encrypt_text(&self, plain: &str) -> Result<String, CipherError> {
///         Ok(plain.chars().rev().collect())
///     }
///     fn decrypt_text(&self, cipher: &str) -> Result<String, CipherError> {
///         Ok(cipher.chars().rev().collect())
///     }
/// }
///
/// let body = json!({"data": {"symbol": "AAPL", "ids": [1, 2], "note": null}});
/// let sealed = Reverse.encrypt_nested(&body).expect("encrypt");
/// assert_eq!(sealed["data"]["note"], json!(null));
/// assert_eq!(Reverse.decrypt_nested(&sealed).expect("decrypt"), body);
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait PayloadCipher: Send + Sync {
    /// Encrypt a UTF-8 string into printable ciphertext.
    fn encrypt_text(&self, plain: &str) -> Result<String, CipherError>;

    /// Decrypt ciphertext produced by [`PayloadCipher::encrypt_text`].
    fn decrypt_text(&self, cipher: &str) -> Result<String, CipherError>;

    /// Encrypt every scalar leaf of `value`. Nulls are kept as is.
    fn encrypt_nested(&self, value: &Value) -> Result<Value, CipherError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Array(items) => items
                .iter()
                .map(|item| self.encrypt_nested(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(fields) => fields
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.encrypt_nested(item)?)))
                .collect::<Result<Map<String, Value>, CipherError>>()
                .map(Value::Object),
            leaf => self.encrypt_text(&leaf.to_string()).map(Value::String),
        }
    }

    /// Reverse [`PayloadCipher::encrypt_nested`]. Non-string leaves are kept
    /// as is.
    fn decrypt_nested(&self, value: &Value) -> Result<Value, CipherError> {
        match value {
            Value::String(sealed) => {
                let plain = self.decrypt_text(sealed)?;
                serde_json::from_str(&plain)
                    .map_err(|error| CipherError::decrypt(format!("leaf is not JSON: {error}")))
            }
            Value::Array(items) => items
                .iter()
                .map(|item| self.decrypt_nested(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(fields) => fields
                .iter()
                .map(|(key, item)| Ok((key.clone(), self.decrypt_nested(item)?)))
                .collect::<Result<Map<String, Value>, CipherError>>()
                .map(Value::Object),
            other => Ok(other.clone()),
        }
    }

    /// Decrypt an inbound body. A bare string holds the whole encrypted
    /// document; anything else was encrypted leaf by leaf.
    fn decrypt_body(&self, body: &Value) -> Result<Value, CipherError> {
        match body {
            Value::String(sealed) => {
                let plain = self.decrypt_text(sealed)?;
                serde_json::from_str(&plain)
                    .map_err(|error| CipherError::decrypt(format!("body is not JSON: {error}")))
            }
            other => self.decrypt_nested(other),
        }
    }
}
