//! Owned snapshot of an inbound request handed to the pipeline.
//!
//! Handlers extract an [`InboundRequest`] alongside their path parameters so
//! the pipeline can authorise, audit and validate without touching actix
//! types again.

use std::collections::BTreeMap;

use actix_web::dev::Payload;
use actix_web::http::{Method, header};
use actix_web::web::Bytes;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use pagination::RequestLocation;
use serde_json::Value;

const BEARER_PREFIX: &str = "Bearer ";

/// Payload fields whose values never reach audit records.
const SECRET_FIELDS: [&str; 4] = ["password", "current_password", "new_password", "otp"];

/// Placeholder recorded in place of a secret value.
pub const REDACTED: &str = "[redacted]";

/// Method, target, headers and raw body of one request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: BTreeMap<String, String>,
    bearer: Option<String>,
    client: Option<String>,
    body: Bytes,
}

impl InboundRequest {
    /// Capture `req` and its already buffered `body`.
    ///
    /// The `Authorization` header is kept out of [`InboundRequest::headers`];
    /// a bearer token it carries is exposed through
    /// [`InboundRequest::bearer_token`] instead.
    pub fn new(req: &HttpRequest, body: Bytes) -> Self {
        let headers = req
            .headers()
            .iter()
            .filter(|(name, _)| *name != header::AUTHORIZATION)
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|text| (name.as_str().to_owned(), text.to_owned()))
            })
            .collect();
        let bearer = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_owned);
        let query = Some(req.query_string())
            .filter(|query| !query.is_empty())
            .map(str::to_owned);
        Self {
            method: req.method().clone(),
            path: req.path().to_owned(),
            query,
            headers,
            bearer,
            client: req.peer_addr().map(|addr| addr.ip().to_string()),
            body,
        }
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        self.path.as_str()
    }

    /// Raw query string, when present.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Path followed by the query string, as recorded in audit entries.
    pub fn endpoint(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }

    /// Request headers with lower-case names, credentials removed.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Token from an `Authorization: Bearer` header.
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer.as_deref()
    }

    /// IP address of the connected peer, when known.
    pub fn client_addr(&self) -> Option<&str> {
        self.client.as_deref()
    }

    /// Raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text for audit records; invalid UTF-8 is replaced.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body as recorded in audit entries, with secret fields masked.
    ///
    /// Bodies that are not JSON objects are recorded as text.
    pub fn redacted_body_text(&self) -> String {
        match serde_json::from_slice::<Value>(&self.body) {
            Ok(Value::Object(mut fields)) => {
                for name in SECRET_FIELDS {
                    if let Some(value) = fields.get_mut(name) {
                        *value = Value::String(REDACTED.to_owned());
                    }
                }
                Value::Object(fields).to_string()
            }
            _ => self.body_text(),
        }
    }

    /// Whether the method carries a payload that endpoints validate.
    pub fn carries_payload(&self) -> bool {
        matches!(self.method, Method::POST | Method::PUT | Method::PATCH)
    }

    /// Path and query used to build pagination links.
    pub fn location(&self) -> RequestLocation {
        RequestLocation::new(self.path.clone(), self.query.as_deref())
    }
}

impl FromRequest for InboundRequest {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        let body = Bytes::from_request(&req, payload);
        Box::pin(async move { body.await.map(|bytes| Self::new(&req, bytes)) })
    }
}
