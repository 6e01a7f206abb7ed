//! Uniform JSON envelope for every pipeline response.
//!
//! Errors whose status is 400, 404 or 500 render as `{"message": ...}`;
//! every other error status renders the field-error shape
//! `{"errors": {field: [messages]}}`. Success bodies are projected through
//! the endpoint's [`ResponseSchema`], optionally wrapped in `{"data": ...}`,
//! normalised to a JSON object and finally encrypted leaf by leaf when a
//! cipher is configured.

use std::sync::Arc;

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

use crate::domain::ports::{CipherError, PayloadCipher};
use crate::domain::{Error, ErrorCode, FieldErrors, PERMISSION_DENIED};

/// Message of the 500 response produced for faults.
pub const SERVER_ERROR: &str = "Server error";

/// Flat error body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageBody {
    /// Human-readable message.
    #[schema(example = "Stock not found")]
    pub message: String,
}

/// Field error body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorsBody {
    /// Messages keyed by field, `non_field_errors` for general ones.
    #[schema(value_type = Object)]
    pub errors: FieldErrors,
}

/// Fault body returned with status 500.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FaultBody {
    /// Always `Server error`.
    pub message: String,
    /// Stringified cause.
    pub error: String,
}

/// Shape of the value an endpoint returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// A single object.
    One,
    /// An array of objects.
    Many,
    /// A pagination window whose `data` holds the objects.
    Page,
}

/// Field projection applied to success values.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use stockdesk::inbound::http::envelope::ResponseSchema;
///
/// let schema = ResponseSchema::one(&["id", "symbol"]);
/// let shaped = schema.project(json!({"id": 1, "symbol": "AAPL", "deleted_by": null}));
/// assert_eq!(shaped, json!({"id": 1, "symbol": "AAPL"}));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSchema {
    fields: &'static [&'static str],
    cardinality: Cardinality,
}

impl ResponseSchema {
    /// Project a single object.
    pub const fn one(fields: &'static [&'static str]) -> Self {
        Self {
            fields,
            cardinality: Cardinality::One,
        }
    }

    /// Project every element of an array.
    pub const fn many(fields: &'static [&'static str]) -> Self {
        Self {
            fields,
            cardinality: Cardinality::Many,
        }
    }

    /// Project every row of a pagination window.
    pub const fn page(fields: &'static [&'static str]) -> Self {
        Self {
            fields,
            cardinality: Cardinality::Page,
        }
    }

    /// Fields kept by the projection.
    pub const fn fields(&self) -> &'static [&'static str] {
        self.fields
    }

    /// Keep only the declared fields. Values of an unexpected shape pass
    /// through untouched.
    pub fn project(&self, value: Value) -> Value {
        match (self.cardinality, value) {
            (Cardinality::One, Value::Object(object)) => Value::Object(self.keep(object)),
            (Cardinality::Many, Value::Array(items)) => Value::Array(self.keep_all(items)),
            (Cardinality::Page, Value::Object(mut window)) => {
                if let Some(Value::Array(rows)) = window.remove("data") {
                    window.insert("data".to_owned(), Value::Array(self.keep_all(rows)));
                }
                Value::Object(window)
            }
            (_, other) => other,
        }
    }

    fn keep(&self, mut object: Map<String, Value>) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|field| object.remove(*field).map(|value| ((*field).to_owned(), value)))
            .collect()
    }

    fn keep_all(&self, items: Vec<Value>) -> Vec<Value> {
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(object) => Value::Object(self.keep(object)),
                other => other,
            })
            .collect()
    }
}

/// Per-endpoint rendering options for success values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOptions {
    /// Projection applied before wrapping.
    pub schema: Option<ResponseSchema>,
    /// Wrap the projected value in `{"data": ...}`.
    pub wrap_data: bool,
    /// Success status.
    pub status: StatusCode,
    /// Message added next to the payload.
    pub message: Option<&'static str>,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        Self {
            schema: None,
            wrap_data: false,
            status: StatusCode::OK,
            message: None,
        }
    }
}

/// Status and body ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Response status.
    pub status: StatusCode,
    /// JSON body.
    pub body: Value,
}

impl Rendered {
    /// Body serialised as JSON text, as stored in audit records.
    pub fn body_text(&self) -> String {
        self.body.to_string()
    }

    /// Convert into an actix response.
    pub fn into_response(self) -> HttpResponse {
        HttpResponse::build(self.status).json(self.body)
    }
}

/// HTTP status for an error code.
pub const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Render an operation error.
///
/// # Examples
/// ```
/// use actix_web::http::StatusCode;
/// use serde_json::json;
/// use stockdesk::domain::Error;
/// use stockdesk::inbound::http::envelope::render_error;
///
/// let rendered = render_error(&Error::not_found("Stock not found"));
/// assert_eq!(rendered.status, StatusCode::NOT_FOUND);
/// assert_eq!(rendered.body, json!({"message": "Stock not found"}));
/// ```
pub fn render_error(error: &Error) -> Rendered {
    let status = status_for(error.code());
    let body = match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::INTERNAL_SERVER_ERROR => {
            json!({ "message": error.message() })
        }
        _ => json!({ "errors": error.to_field_errors() }),
    };
    Rendered { status, body }
}

/// Render the guard's denial.
pub fn render_denied() -> Rendered {
    Rendered {
        status: StatusCode::FORBIDDEN,
        body: json!({ "message": PERMISSION_DENIED }),
    }
}

/// Render a fault caught at the pipeline boundary.
pub fn render_fault(cause: &str) -> Rendered {
    Rendered {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({ "message": SERVER_ERROR, "error": cause }),
    }
}

/// Wrap non-object payloads so every success body is a JSON object.
fn normalise(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(object) => object,
        Value::Null => Map::new(),
        other => Map::from_iter([("data".to_owned(), other)]),
    }
}

/// Success renderer holding the optional transport cipher.
#[derive(Clone, Default)]
pub struct Envelope {
    cipher: Option<Arc<dyn PayloadCipher>>,
}

impl Envelope {
    /// Envelope encrypting success bodies with `cipher` when present.
    pub fn new(cipher: Option<Arc<dyn PayloadCipher>>) -> Self {
        Self { cipher }
    }

    /// Configured cipher.
    pub fn cipher(&self) -> Option<&Arc<dyn PayloadCipher>> {
        self.cipher.as_ref()
    }

    /// Render a success value: project, wrap, normalise, annotate, encrypt.
    ///
    /// # Errors
    /// Returns [`CipherError`] when encryption fails.
    pub fn success(
        &self,
        value: Value,
        options: &ResponseOptions,
    ) -> Result<Rendered, CipherError> {
        let projected = match options.schema {
            Some(schema) => schema.project(value),
            None => value,
        };
        let wrapped = if options.wrap_data {
            json!({ "data": projected })
        } else {
            projected
        };
        let mut object = normalise(wrapped);
        if let Some(message) = options.message {
            object.insert("message".to_owned(), Value::String(message.to_owned()));
        }
        let body = Value::Object(object);
        let body = match &self.cipher {
            Some(cipher) => cipher.encrypt_nested(&body)?,
            None => body,
        };
        Ok(Rendered {
            status: options.status,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    struct Tagging;

    impl PayloadCipher for Tagging {
        fn encrypt_text(&self, plain: &str) -> Result<String, CipherError> {
            Ok(format!("enc({plain})"))
        }

        fn decrypt_text(&self, cipher: &str) -> Result<String, CipherError> {
            Ok(cipher.to_owned())
        }
    }

    const FIELDS: &[&str] = &["id", "symbol"];

    #[rstest]
    #[case(Error::invalid_request("Invalid operation."), 400)]
    #[case(Error::not_found("User not found"), 404)]
    #[case(Error::internal("Operation error: boom"), 500)]
    fn flat_statuses_render_message(#[case] error: Error, #[case] status: u16) {
        let rendered = render_error(&error);
        assert_eq!(rendered.status.as_u16(), status);
        assert_eq!(rendered.body, json!({ "message": error.message() }));
    }

    #[rstest]
    #[case(Error::unauthorized("Invalid token"), 401)]
    #[case(Error::forbidden("Not yours"), 403)]
    #[case(Error::too_many_requests("Request was throttled"), 429)]
    fn other_statuses_render_non_field_errors(#[case] error: Error, #[case] status: u16) {
        let rendered = render_error(&error);
        assert_eq!(rendered.status.as_u16(), status);
        assert_eq!(
            rendered.body,
            json!({ "errors": { "non_field_errors": [error.message()] } })
        );
    }

    #[test]
    fn validation_errors_keep_their_fields() {
        let rendered = render_error(&Error::field("email", "Incorrect email/password"));
        assert_eq!(rendered.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            rendered.body,
            json!({ "errors": { "email": ["Incorrect email/password"] } })
        );
    }

    #[test]
    fn denial_is_flat() {
        let rendered = render_denied();
        assert_eq!(rendered.status, StatusCode::FORBIDDEN);
        assert_eq!(rendered.body, json!({ "message": "Permission denied" }));
    }

    #[test]
    fn fault_carries_cause() {
        let rendered = render_fault("division by zero");
        assert_eq!(
            rendered.body,
            json!({ "message": "Server error", "error": "division by zero" })
        );
    }

    #[test]
    fn schema_and_wrap_produce_data_envelope() {
        let options = ResponseOptions {
            schema: Some(ResponseSchema::one(FIELDS)),
            wrap_data: true,
            ..ResponseOptions::default()
        };
        let rendered = Envelope::default()
            .success(json!({ "id": 7, "symbol": "AAPL", "name": "Apple" }), &options)
            .expect("rendered");
        assert_eq!(rendered.status, StatusCode::OK);
        assert_eq!(rendered.body, json!({ "data": { "id": 7, "symbol": "AAPL" } }));
    }

    #[rstest]
    #[case(Value::Null, json!({}))]
    #[case(json!([1, 2]), json!({ "data": [1, 2] }))]
    #[case(json!("ok"), json!({ "data": "ok" }))]
    #[case(json!({ "id": 1 }), json!({ "id": 1 }))]
    fn success_bodies_are_objects(#[case] value: Value, #[case] expected: Value) {
        let rendered = Envelope::default()
            .success(value, &ResponseOptions::default())
            .expect("rendered");
        assert_eq!(rendered.body, expected);
    }

    #[test]
    fn many_and_page_project_each_row() {
        let rows = json!([{ "id": 1, "secret": "x" }, { "id": 2, "secret": "y" }]);
        assert_eq!(
            ResponseSchema::many(FIELDS).project(rows.clone()),
            json!([{ "id": 1 }, { "id": 2 }])
        );
        let window = json!({ "total": 2, "data": rows });
        assert_eq!(
            ResponseSchema::page(FIELDS).project(window),
            json!({ "total": 2, "data": [{ "id": 1 }, { "id": 2 }] })
        );
    }

    #[test]
    fn message_and_status_are_applied() {
        let options = ResponseOptions {
            wrap_data: true,
            status: StatusCode::CREATED,
            message: Some("Account was created successfully"),
            ..ResponseOptions::default()
        };
        let rendered = Envelope::default()
            .success(json!({ "access_token": "t" }), &options)
            .expect("rendered");
        assert_eq!(rendered.status, StatusCode::CREATED);
        assert_eq!(
            rendered.body,
            json!({
                "data": { "access_token": "t" },
                "message": "Account was created successfully"
            })
        );
    }

    #[test]
    fn cipher_encrypts_every_leaf() {
        let envelope = Envelope::new(Some(Arc::new(Tagging)));

        let rendered = envelope
            .success(json!({ "id": 7, "tags": ["a"] }), &ResponseOptions::default())
            .expect("rendered");

        assert_eq!(
            rendered.body,
            json!({ "id": "enc(7)", "tags": ["enc(\"a\")"] })
        );
    }
}
