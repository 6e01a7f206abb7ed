//! Request payload schemas and field-level validation helpers.
//!
//! A request schema is a serde DTO whose [`RequestSchema::validate`] turns
//! the raw fields into the domain input of an operation, collecting every
//! field problem into [`FieldErrors`] rather than stopping at the first.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::FieldErrors;

/// Message reported for a required field that is absent or blank.
pub const REQUIRED: &str = "This field is required.";

/// Message reported when the body is not a JSON document.
pub const MALFORMED_BODY: &str = "Malformed JSON body.";

/// Deserialisable payload that validates into an operation input.
pub trait RequestSchema: DeserializeOwned {
    /// Validated input handed to the operation.
    type Valid: Send + 'static;

    /// Whether the endpoint reads a payload at all.
    const DECLARED: bool = true;

    /// Check every field and build the operation input.
    fn validate(self) -> Result<Self::Valid, FieldErrors>;
}

/// Schema of endpoints that take no payload.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NoBody;

impl RequestSchema for NoBody {
    type Valid = ();

    const DECLARED: bool = false;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        Ok(())
    }
}

/// Deserialise `body` into `S` and validate it.
///
/// # Examples
/// ```
/// use serde::Deserialize;
/// use serde_json::json;
/// use stockdesk::domain::FieldErrors;
/// use stockdesk::inbound::http::validation::{RequestSchema, parse_payload, required};
///
/// #[derive(Deserialize)]
/// struct Ping {
///     name: Option<String>,
/// }
///
/// impl RequestSchema for Ping {
///     type Valid = String;
///
///     fn validate(self) -> Result<String, FieldErrors> {
///         let mut errors = FieldErrors::default();
///         let name = required(&mut errors, "name", self.name);
///         name.ok_or(errors)
///     }
/// }
///
/// assert_eq!(parse_payload::<Ping>(json!({"name": "desk"})).ok(), Some("desk".to_owned()));
/// assert!(parse_payload::<Ping>(json!({})).is_err());
/// ```
pub fn parse_payload<S: RequestSchema>(body: Value) -> Result<S::Valid, FieldErrors> {
    let raw: S = serde_json::from_value(body).map_err(|error| serde_errors(&error))?;
    raw.validate()
}

/// Parse raw body bytes into a JSON document. An empty body reads as `{}`.
pub fn parse_body(raw: &[u8]) -> Result<Value, FieldErrors> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(raw).map_err(|_| FieldErrors::non_field(MALFORMED_BODY))
}

static MISSING_FIELD_RE: OnceLock<Regex> = OnceLock::new();

fn missing_field_regex() -> &'static Regex {
    MISSING_FIELD_RE.get_or_init(|| {
        Regex::new(r"missing field `(\w+)`")
            .unwrap_or_else(|error| panic!("missing field regex failed to compile: {error}"))
    })
}

/// Map a serde failure onto field errors.
///
/// Missing fields become [`REQUIRED`] under the field name; anything else is
/// reported as a non-field error.
fn serde_errors(error: &serde_json::Error) -> FieldErrors {
    let text = error.to_string();
    match missing_field_regex()
        .captures(&text)
        .and_then(|found| found.get(1))
    {
        Some(field) => FieldErrors::single(field.as_str(), REQUIRED),
        None => FieldErrors::non_field(text),
    }
}

/// Record [`REQUIRED`] for a missing or blank value, otherwise return it
/// trimmed.
pub fn required(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    match value.map(|raw| raw.trim().to_owned()) {
        Some(text) if !text.is_empty() => Some(text),
        _ => {
            errors.push(field, REQUIRED);
            None
        }
    }
}

/// Like [`required`] but keeps surrounding whitespace, for passwords.
pub fn secret(errors: &mut FieldErrors, field: &str, value: Option<String>) -> Option<String> {
    match value {
        Some(text) if !text.is_empty() => Some(text),
        _ => {
            errors.push(field, REQUIRED);
            None
        }
    }
}

/// Record the error of a failed conversion under `field`.
pub fn checked<T, E: fmt::Display>(
    errors: &mut FieldErrors,
    field: &str,
    parsed: Result<T, E>,
) -> Option<T> {
    parsed
        .map_err(|error| errors.push(field, error.to_string()))
        .ok()
}

/// Trim an optional value, treating blank text as absent.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_owned())
        .filter(|text| !text.is_empty())
}
