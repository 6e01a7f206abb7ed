//! Generic request pipeline shared by every REST handler.
//!
//! [`RequestPipeline::process`] runs the same sequence for each request:
//!
//! 1. refuse throttled clients with 429, then resolve the bearer token and
//!    evaluate the endpoint's [`Requirement`]; a denial returns 403 before
//!    anything else happens;
//! 2. record the request on the audit side channel under a fresh [`RefId`];
//! 3. decrypt and validate the payload of POST, PUT and PATCH requests;
//! 4. run the operation and render its outcome through the [`Envelope`];
//! 5. complete the audit record with the rendered response.
//!
//! Panics raised while decrypting, validating or running the operation are
//! caught once here and rendered as a 500 fault.

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use async_trait::async_trait;
use futures_util::FutureExt;
use mockable::Clock;
use pagination::{PageRequest, PaginationWindow, RequestLocation, paginate};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use url::form_urlencoded;

use super::envelope::{
    Envelope, Rendered, ResponseOptions, ResponseSchema, render_denied, render_error,
    render_fault,
};
use super::request::InboundRequest;
use super::throttle::{RateLimiter, THROTTLED};
use super::validation::{NoBody, RequestSchema, parse_body, parse_payload};
use crate::domain::ports::{AuditDispatcher, ListSlice};
use crate::domain::{
    AuditCompletion, AuditJob, AuditRequest, AuditStatus, AuthService, Error, ErrorCode,
    OperationResult, Principal, RefId, Requirement, TraceId,
};

const UNKNOWN_CLIENT: &str = "unknown";

/// Resolves bearer tokens into principals.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Principal owning `token`.
    async fn authenticate(&self, token: &str) -> OperationResult<Principal>;
}

#[async_trait]
impl Authenticator for AuthService {
    async fn authenticate(&self, token: &str) -> OperationResult<Principal> {
        self.resolve_principal(token).await
    }
}

/// Static declaration of one endpoint: who may call it, what payload it
/// reads and how its result is rendered.
///
/// # Examples
/// ```
/// use actix_web::http::StatusCode;
/// use stockdesk::domain::Requirement;
/// use stockdesk::inbound::http::pipeline::Endpoint;
///
/// let endpoint = Endpoint::new("create_stock")
///     .require(Requirement::super_admin())
///     .status(StatusCode::CREATED)
///     .wrap_data();
/// assert_eq!(endpoint.options().status, StatusCode::CREATED);
/// assert!(endpoint.is_audited());
/// ```
pub struct Endpoint<S = NoBody> {
    name: &'static str,
    requirement: Requirement,
    audited: bool,
    throttled: bool,
    options: ResponseOptions,
    schema: PhantomData<fn() -> S>,
}

impl Endpoint<NoBody> {
    /// Public, audited endpoint without payload, rendering with defaults.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            requirement: Requirement::Anonymous,
            audited: true,
            throttled: false,
            options: ResponseOptions::default(),
            schema: PhantomData,
        }
    }
}

impl<S: RequestSchema> Endpoint<S> {
    /// Validate POST, PUT and PATCH payloads against `T`.
    pub fn accepts<T: RequestSchema>(self) -> Endpoint<T> {
        Endpoint {
            name: self.name,
            requirement: self.requirement,
            audited: self.audited,
            throttled: self.throttled,
            options: self.options,
            schema: PhantomData,
        }
    }

    /// Access requirement checked before anything else.
    pub fn require(mut self, requirement: Requirement) -> Self {
        self.requirement = requirement;
        self
    }

    /// Skip the audit side channel.
    pub fn unaudited(mut self) -> Self {
        self.audited = false;
        self
    }

    /// Count requests per client against the pipeline's rate limiter.
    pub fn throttled(mut self) -> Self {
        self.throttled = true;
        self
    }

    /// Wrap the success value in `{"data": ...}`.
    pub fn wrap_data(mut self) -> Self {
        self.options.wrap_data = true;
        self
    }

    /// Success status other than 200.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.options.status = status;
        self
    }

    /// Project the success value.
    pub fn schema(mut self, schema: ResponseSchema) -> Self {
        self.options.schema = Some(schema);
        self
    }

    /// Message added to the success body.
    pub fn message(mut self, message: &'static str) -> Self {
        self.options.message = Some(message);
        self
    }

    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared requirement.
    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Whether requests are recorded on the audit side channel.
    pub const fn is_audited(&self) -> bool {
        self.audited
    }

    /// Whether requests count against the rate limiter.
    pub const fn is_throttled(&self) -> bool {
        self.throttled
    }

    /// Rendering options.
    pub fn options(&self) -> &ResponseOptions {
        &self.options
    }

    fn reads_payload(&self, request: &InboundRequest) -> bool {
        S::DECLARED && request.carries_payload()
    }
}

/// Everything an operation receives from the pipeline.
#[derive(Debug)]
pub struct Call<P> {
    principal: Option<Principal>,
    payload: Option<P>,
    location: RequestLocation,
    query: Option<String>,
}

impl<P> Call<P> {
    /// Bundle the inputs of an operation.
    pub fn new(
        principal: Option<Principal>,
        payload: Option<P>,
        location: RequestLocation,
        query: Option<String>,
    ) -> Self {
        Self {
            principal,
            payload,
            location,
            query,
        }
    }

    /// Authenticated caller, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Authenticated caller, denying anonymous calls.
    pub fn actor(&self) -> OperationResult<&Principal> {
        self.principal.as_ref().ok_or_else(Error::permission_denied)
    }

    /// Validated payload. Available once per call.
    pub fn take_payload(&mut self) -> OperationResult<P> {
        self.payload
            .take()
            .ok_or_else(|| Error::internal("Request payload unavailable"))
    }

    /// Path and query of the request.
    pub fn location(&self) -> &RequestLocation {
        &self.location
    }

    /// First value of a query parameter, trimmed, blank values ignored.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    /// Page selection from the query string. Unusable values fall back to
    /// their defaults.
    pub fn page_request(&self) -> PageRequest {
        let (request, problems) =
            PageRequest::from_query_lenient(self.query.as_deref().unwrap_or_default());
        for problem in problems {
            warn!(error = %problem, path = self.location.path(), "ignoring pagination parameter");
        }
        request
    }

    /// Window over one listing slice with links relative to this request.
    pub fn window<T>(&self, slice: ListSlice<T>, request: PageRequest) -> PaginationWindow<T> {
        paginate(slice.items, slice.total, request, &self.location)
    }
}

/// Rendered response plus the status recorded against the audit entry.
struct Outcome {
    rendered: Rendered,
    status: AuditStatus,
}

impl Outcome {
    fn success(rendered: Rendered) -> Self {
        Self {
            rendered,
            status: AuditStatus::Success,
        }
    }

    fn failed(rendered: Rendered) -> Self {
        Self {
            rendered,
            status: AuditStatus::Failed,
        }
    }
}

enum Rejection {
    Invalid(Error),
    Fault(String),
}

fn panic_cause(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

fn trace_label() -> String {
    TraceId::current()
        .map(|id| id.to_string())
        .unwrap_or_default()
}

/// Collaborators shared by every endpoint.
#[derive(Clone)]
pub struct RequestPipeline {
    authenticator: Arc<dyn Authenticator>,
    audit: Arc<dyn AuditDispatcher>,
    envelope: Envelope,
    clock: Arc<dyn Clock>,
    limiter: Option<Arc<RateLimiter>>,
}

impl RequestPipeline {
    /// Assemble the pipeline.
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        audit: Arc<dyn AuditDispatcher>,
        envelope: Envelope,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            authenticator,
            audit,
            envelope,
            clock,
            limiter: None,
        }
    }

    /// Throttle endpoints declared with [`Endpoint::throttled`] through
    /// `limiter`.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Run `operation` for `request` under `endpoint`'s declaration.
    pub async fn process<S, T, F, Fut>(
        &self,
        endpoint: &Endpoint<S>,
        request: InboundRequest,
        operation: F,
    ) -> HttpResponse
    where
        S: RequestSchema,
        T: Serialize,
        F: FnOnce(Call<S::Valid>) -> Fut,
        Fut: Future<Output = OperationResult<T>>,
    {
        self.render(endpoint, request, operation)
            .await
            .into_response()
    }

    /// Like [`RequestPipeline::process`] but returns the rendered envelope.
    pub async fn render<S, T, F, Fut>(
        &self,
        endpoint: &Endpoint<S>,
        request: InboundRequest,
        operation: F,
    ) -> Rendered
    where
        S: RequestSchema,
        T: Serialize,
        F: FnOnce(Call<S::Valid>) -> Fut,
        Fut: Future<Output = OperationResult<T>>,
    {
        if !self.admits(endpoint, &request) {
            return render_error(&Error::too_many_requests(THROTTLED));
        }

        let principal = self.identify(&request).await;
        if let Err(denied) = endpoint.requirement().evaluate(principal.as_ref()) {
            info!(
                trace_id = %trace_label(),
                endpoint = endpoint.name(),
                user_id = ?principal.as_ref().map(|caller| caller.user_id),
                reason = denied.message(),
                "request denied"
            );
            return render_denied();
        }

        let ref_id = endpoint
            .is_audited()
            .then(|| self.open_audit(&request, principal.as_ref()));

        let staged = AssertUnwindSafe(self.stage(endpoint, &request, principal, operation))
            .catch_unwind()
            .await;
        let outcome = staged.unwrap_or_else(|panic| {
            let cause = panic_cause(panic.as_ref());
            error!(
                trace_id = %trace_label(),
                endpoint = endpoint.name(),
                cause = %cause,
                "operation panicked"
            );
            Outcome::failed(render_fault(&cause))
        });

        if let Some(ref_id) = ref_id {
            self.close_audit(ref_id, &outcome);
        }
        outcome.rendered
    }

    fn admits<S: RequestSchema>(&self, endpoint: &Endpoint<S>, request: &InboundRequest) -> bool {
        let Some(limiter) = self.limiter.as_ref().filter(|_| endpoint.is_throttled()) else {
            return true;
        };
        let client = request.client_addr().unwrap_or(UNKNOWN_CLIENT);
        let admitted = limiter.admit(client);
        if !admitted {
            warn!(
                trace_id = %trace_label(),
                endpoint = endpoint.name(),
                client,
                "request throttled"
            );
        }
        admitted
    }

    async fn identify(&self, request: &InboundRequest) -> Option<Principal> {
        let token = request.bearer_token()?;
        match self.authenticator.authenticate(token).await {
            Ok(principal) => Some(principal),
            Err(error) => {
                debug!(
                    trace_id = %trace_label(),
                    reason = error.message(),
                    "bearer token rejected"
                );
                None
            }
        }
    }

    async fn stage<S, T, F, Fut>(
        &self,
        endpoint: &Endpoint<S>,
        request: &InboundRequest,
        principal: Option<Principal>,
        operation: F,
    ) -> Outcome
    where
        S: RequestSchema,
        T: Serialize,
        F: FnOnce(Call<S::Valid>) -> Fut,
        Fut: Future<Output = OperationResult<T>>,
    {
        let payload = if endpoint.reads_payload(request) {
            match self.read_payload::<S>(request) {
                Ok(valid) => Some(valid),
                Err(Rejection::Invalid(error)) => {
                    debug!(endpoint = endpoint.name(), "payload rejected");
                    return Outcome::failed(render_error(&error));
                }
                Err(Rejection::Fault(cause)) => {
                    error!(
                        trace_id = %trace_label(),
                        endpoint = endpoint.name(),
                        cause = %cause,
                        "payload could not be decrypted"
                    );
                    return Outcome::failed(render_fault(&cause));
                }
            }
        } else {
            None
        };

        let call = Call::new(
            principal,
            payload,
            request.location(),
            request.query().map(str::to_owned),
        );
        match operation(call).await {
            Ok(value) => self.render_value(endpoint, &value),
            Err(failure) => {
                if failure.code() == ErrorCode::InternalError {
                    error!(
                        trace_id = %trace_label(),
                        endpoint = endpoint.name(),
                        error = %failure,
                        "operation failed"
                    );
                } else {
                    debug!(endpoint = endpoint.name(), error = %failure, "operation refused");
                }
                Outcome::failed(render_error(&failure))
            }
        }
    }

    fn read_payload<S: RequestSchema>(
        &self,
        request: &InboundRequest,
    ) -> Result<S::Valid, Rejection> {
        let body = parse_body(request.body())
            .map_err(|errors| Rejection::Invalid(Error::validation(errors)))?;
        let body = match self.envelope.cipher() {
            Some(cipher) if !request.body().is_empty() => cipher
                .decrypt_body(&body)
                .map_err(|cause| Rejection::Fault(cause.to_string()))?,
            _ => body,
        };
        parse_payload::<S>(body).map_err(|errors| Rejection::Invalid(Error::validation(errors)))
    }

    fn render_value<S, T: Serialize>(&self, endpoint: &Endpoint<S>, value: &T) -> Outcome
    where
        S: RequestSchema,
    {
        let rendered = serde_json::to_value(value)
            .map_err(|cause| cause.to_string())
            .and_then(|json| {
                self.envelope
                    .success(json, endpoint.options())
                    .map_err(|cause| cause.to_string())
            });
        match rendered {
            Ok(rendered) => Outcome::success(rendered),
            Err(cause) => {
                error!(
                    trace_id = %trace_label(),
                    endpoint = endpoint.name(),
                    cause = %cause,
                    "response could not be rendered"
                );
                Outcome::failed(render_fault(&cause))
            }
        }
    }

    fn open_audit(&self, request: &InboundRequest, principal: Option<&Principal>) -> RefId {
        let ref_id = RefId::generate();
        let job = AuditJob::Record(AuditRequest {
            ref_id: ref_id.clone(),
            user_id: principal.map(|caller| caller.user_id),
            method: request.method().to_string(),
            endpoint: request.endpoint(),
            headers: request.headers().clone(),
            request_body: request.redacted_body_text(),
            received_at: self.clock.utc(),
        });
        self.dispatch(job);
        ref_id
    }

    fn close_audit(&self, ref_id: RefId, outcome: &Outcome) {
        self.dispatch(AuditJob::Complete(AuditCompletion {
            ref_id,
            status: outcome.status,
            response_body: outcome.rendered.body_text(),
            completed_at: self.clock.utc(),
        }));
    }

    fn dispatch(&self, job: AuditJob) {
        let ref_id = job.ref_id().clone();
        if let Err(error) = self.audit.dispatch(job) {
            warn!(trace_id = %trace_label(), ref_id = %ref_id, %error, "audit job dropped");
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
