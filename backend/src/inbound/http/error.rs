//! HTTP adapter mapping for domain errors.
//!
//! Purpose: keep the domain error type HTTP-agnostic while letting actix
//! extractors and handlers outside the pipeline render failures with the
//! same envelope rules as pipeline responses.

use actix_web::error::PathError;
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode};
use tracing::debug;

use super::envelope::{render_error, status_for};
use crate::domain::Error;

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        render_error(self).into_response()
    }
}

/// Path extraction failures mean the addressed resource cannot exist.
pub fn path_error(err: PathError, req: &HttpRequest) -> actix_web::Error {
    debug!(error = %err, path = req.path(), "path parameter rejected");
    Error::not_found("Not found").into()
}
