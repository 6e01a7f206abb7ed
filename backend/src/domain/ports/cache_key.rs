//! Keys addressing cached lookup outcomes.
use std::fmt;

use thiserror::Error;

const SEPARATOR: char = ':';

/// Cache key built from a namespace and identifying parts, e.g.
/// `user_email:ada@example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Construct a key after validating that it is non-empty and trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, CacheKeyValidationError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(CacheKeyValidationError::Empty);
        }
        if raw.trim() != raw {
            return Err(CacheKeyValidationError::ContainsWhitespace);
        }
        Ok(Self(raw))
    }

    /// Join `namespace` and `parts` with `:`.
    ///
    /// Whitespace inside parts is replaced with `_` so user-supplied values
    /// (emails, symbols) always yield a valid key.
    ///
    /// # Examples
    /// ```
    /// use stockdesk::domain::ports::CacheKey;
    ///
    /// let key = CacheKey::from_parts("stock_symbol", [" aapl "]);
    /// assert_eq!(key.as_str(), "stock_symbol:aapl");
    /// ```
    pub fn from_parts<I, P>(namespace: &str, parts: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: fmt::Display,
    {
        let mut key = sanitise(namespace);
        for part in parts {
            key.push(SEPARATOR);
            key.push_str(&sanitise(&part.to_string()));
        }
        Self(key)
    }

    /// Borrow the underlying key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn sanitise(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheKeyValidationError {
    /// Key is empty after trimming whitespace.
    #[error("cache key must not be empty")]
    Empty,
    /// Key contains leading or trailing whitespace.
    #[error("cache key must not contain surrounding whitespace")]
    ContainsWhitespace,
}
