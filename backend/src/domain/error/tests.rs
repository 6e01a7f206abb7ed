//! Tests for domain errors and field error collection.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

#[fixture]
fn email_errors() -> FieldErrors {
    let mut errors = FieldErrors::default();
    errors.push("email", "Enter a valid email address.");
    errors
}

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("who"), ErrorCode::Unauthorized)]
#[case(Error::forbidden("no"), ErrorCode::Forbidden)]
#[case(Error::not_found("gone"), ErrorCode::NotFound)]
#[case(Error::field("email", "taken"), ErrorCode::ValidationFailed)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
#[case(Error::too_many_requests("slow down"), ErrorCode::TooManyRequests)]
fn constructors_set_codes(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn permission_denied_uses_fixed_message() {
    let error = Error::permission_denied();
    assert_eq!(error.code(), ErrorCode::Forbidden);
    assert_eq!(error.message(), PERMISSION_DENIED);
}

#[rstest]
fn fault_prefixes_the_cause() {
    let error = Error::fault("connection reset");
    assert_eq!(error.message(), "Operation error: connection reset");
    assert_eq!(error.code(), ErrorCode::InternalError);
}

#[rstest]
fn bare_messages_become_non_field_errors() {
    let errors = Error::forbidden("not yours").to_field_errors();
    assert_eq!(
        errors.get(NON_FIELD_ERRORS),
        Some(["not yours".to_owned()].as_slice())
    );
}

#[rstest]
fn validation_keeps_field_errors(email_errors: FieldErrors) {
    let error = Error::validation(email_errors.clone());
    assert_eq!(error.field_errors(), Some(&email_errors));
    assert_eq!(error.to_field_errors(), email_errors);
}

#[rstest]
fn extend_merges_messages_per_field(mut email_errors: FieldErrors) {
    email_errors.extend(FieldErrors::single("email", "This field is required."));
    email_errors.extend(FieldErrors::single("password", "Too short."));
    assert_eq!(email_errors.get("email").map(<[String]>::len), Some(2));
    assert_eq!(email_errors.iter().count(), 2);
}

#[rstest]
fn into_result_reports_presence(email_errors: FieldErrors) {
    assert!(FieldErrors::default().into_result().is_ok());
    assert!(email_errors.into_result().is_err());
}

#[rstest]
fn errors_survive_a_serde_round_trip(email_errors: FieldErrors) {
    let error = Error::validation(email_errors);
    let value = serde_json::to_value(&error).expect("serialise error");
    assert_eq!(
        value,
        json!({
            "code": "validation_failed",
            "message": "Validation failed",
            "field_errors": {"email": ["Enter a valid email address."]},
        })
    );
    let back: Error = serde_json::from_value(value).expect("deserialise error");
    assert_eq!(back, error);
}

#[rstest]
fn flat_errors_omit_field_errors() {
    let value = serde_json::to_value(Error::not_found("Stock not found")).expect("serialise");
    assert_eq!(value, json!({"code": "not_found", "message": "Stock not found"}));
}
