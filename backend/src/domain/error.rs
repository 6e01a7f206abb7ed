//! Domain-level error types.
//!
//! These errors are transport agnostic. The HTTP envelope maps each
//! [`ErrorCode`] to a status and decides between the flat `{"message"}` shape
//! and the structured field-error shape.
//!
//! Errors are serialisable because lookups cache failed outcomes next to
//! successful ones.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Key under which messages not tied to a single field are reported.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Message returned whenever an authorization requirement is not met.
pub const PERMISSION_DENIED: &str = "Permission denied";

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request breaks a business rule or is malformed.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// The payload failed field validation.
    ValidationFailed,
    /// The caller sent too many requests in a short period.
    TooManyRequests,
    /// An unexpected error occurred inside the domain or an adapter.
    InternalError,
}

/// Validation messages keyed by field name.
///
/// # Examples
/// ```
/// use stockdesk::domain::FieldErrors;
///
/// let mut errors = FieldErrors::default();
/// errors.push("email", "Enter a valid email address.");
/// errors.push("email", "This field is required.");
/// assert_eq!(errors.get("email").map(<[String]>::len), Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Errors holding a single message for `field`.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    /// Errors holding a single message under [`NON_FIELD_ERRORS`].
    pub fn non_field(message: impl Into<String>) -> Self {
        Self::single(NON_FIELD_ERRORS, message)
    }

    /// Append a message for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Fold every message of `other` into `self`.
    pub fn extend(&mut self, other: Self) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Messages recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `true` when no message has been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when empty, otherwise the collected errors.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Iterate fields and their messages in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(field, messages)| (field.as_str(), messages.as_slice()))
    }
}

/// Domain error payload.
///
/// # Examples
/// ```
/// use stockdesk::domain::{Error, ErrorCode};
///
/// let err = Error::not_found("Stock not found");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// assert_eq!(err.to_string(), "Stock not found");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    code: ErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    field_errors: Option<FieldErrors>,
}

impl Error {
    /// Create an error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field_errors: None,
        }
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Structured field errors, when the failure concerns specific fields.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        self.field_errors.as_ref()
    }

    /// Attach structured field errors.
    pub fn with_field_errors(mut self, errors: FieldErrors) -> Self {
        self.field_errors = Some(errors);
        self
    }

    /// Field errors to render, falling back to the message under
    /// [`NON_FIELD_ERRORS`].
    pub fn to_field_errors(&self) -> FieldErrors {
        self.field_errors
            .clone()
            .unwrap_or_else(|| FieldErrors::non_field(self.message.clone()))
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Forbidden error carrying the [`PERMISSION_DENIED`] message.
    pub fn permission_denied() -> Self {
        Self::forbidden(PERMISSION_DENIED)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Validation failure carrying per-field messages.
    pub fn validation(errors: FieldErrors) -> Self {
        Self::new(ErrorCode::ValidationFailed, "Validation failed").with_field_errors(errors)
    }

    /// Validation failure for a single field.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::validation(FieldErrors::single(field, message))
    }

    /// Convenience constructor for [`ErrorCode::TooManyRequests`].
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TooManyRequests, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Internal error wrapping an adapter or operation failure.
    pub fn fault(cause: impl fmt::Display) -> Self {
        Self::internal(format!("Operation error: {cause}"))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

/// Result type returned by every business operation.
///
/// # Examples
/// ```
/// use stockdesk::domain::{Error, OperationResult};
///
/// fn lookup(found: bool) -> OperationResult<u64> {
///     if found { Ok(7) } else { Err(Error::not_found("User not found")) }
/// }
/// assert!(lookup(false).is_err());
/// ```
pub type OperationResult<T> = Result<T, Error>;

#[cfg(test)]
mod tests;
