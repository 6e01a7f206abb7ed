//! Authentication endpoints: login, logout, token refresh, signup and the
//! one-time code flows.
//!
//! Login, signup and the code-sending endpoints are throttled per client
//! address.
//!
//! ```text
//! POST /api/v1/auth/login {"email":"ada@example.com","password":"..."}
//! POST /api/v1/auth/signup/verify-otp {"email":"ada@example.com","otp":"123456"}
//! ```

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, post, web};
use serde::Deserialize;
use utoipa::ToSchema;

use super::envelope::{ErrorsBody, MessageBody};
use super::pipeline::Endpoint;
use super::request::InboundRequest;
use super::state::HttpState;
use super::validation::{RequestSchema, checked, optional, required, secret};
use crate::domain::{
    EmailAddress, FieldErrors, LoginCredentials, LoginOutcome, OTP_LENGTH, OtpPurpose,
    PersonName, Registration, Requirement,
};

const INVALID_CODE: &str = "Enter a valid code.";

fn code(errors: &mut FieldErrors, value: Option<String>) -> Option<String> {
    let text = required(errors, "otp", value)?;
    if text.len() == OTP_LENGTH && text.chars().all(|c| c.is_ascii_digit()) {
        Some(text)
    } else {
        errors.push("otp", INVALID_CODE);
        None
    }
}

fn email(errors: &mut FieldErrors, value: Option<String>) -> Option<EmailAddress> {
    let text = required(errors, "email", value)?;
    checked(errors, "email", EmailAddress::new(text))
}

/// Login request body for `POST /api/v1/auth/login`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Account email.
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    /// Account password.
    pub password: Option<String>,
}

impl RequestSchema for LoginRequest {
    type Valid = LoginCredentials;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let address = email(&mut errors, self.email);
        let password = secret(&mut errors, "password", self.password);
        match (address, password) {
            (Some(address), Some(password)) if errors.is_empty() => {
                Ok(LoginCredentials::new(address, password))
            }
            _ => Err(errors),
        }
    }
}

/// Signup request body for `POST /api/v1/auth/signup`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SignupRequest {
    /// Given name.
    #[schema(example = "Ada")]
    pub first_name: Option<String>,
    /// Family name.
    #[schema(example = "Lovelace")]
    pub last_name: Option<String>,
    /// Login address.
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    /// Optional contact number.
    pub phone: Option<String>,
    /// Password meeting the signup policy.
    pub password: Option<String>,
}

impl RequestSchema for SignupRequest {
    type Valid = Registration;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let first_name = required(&mut errors, "first_name", self.first_name)
            .and_then(|name| checked(&mut errors, "first_name", PersonName::new(name)));
        let last_name = required(&mut errors, "last_name", self.last_name)
            .and_then(|name| checked(&mut errors, "last_name", PersonName::new(name)));
        let address = email(&mut errors, self.email);
        let password = secret(&mut errors, "password", self.password);
        match (first_name, last_name, address, password) {
            (Some(first_name), Some(last_name), Some(email), Some(password))
                if errors.is_empty() =>
            {
                Ok(Registration {
                    first_name,
                    last_name,
                    email,
                    phone: optional(self.phone),
                    password,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Body naming only an account email.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    /// Account email.
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
}

impl RequestSchema for EmailRequest {
    type Valid = EmailAddress;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        email(&mut errors, self.email).ok_or(errors)
    }
}

/// Signup verification body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    /// Account email.
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    /// Six digit code.
    #[schema(example = "123456")]
    pub otp: Option<String>,
}

impl RequestSchema for VerifyOtpRequest {
    type Valid = (EmailAddress, String);

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let address = email(&mut errors, self.email);
        let otp = code(&mut errors, self.otp);
        address.zip(otp).filter(|_| errors.is_empty()).ok_or(errors)
    }
}

/// Password reset body.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    /// Account email.
    #[schema(example = "ada@example.com")]
    pub email: Option<String>,
    /// Six digit code from the reset email.
    #[schema(example = "123456")]
    pub otp: Option<String>,
    /// Replacement password.
    pub password: Option<String>,
}

/// Validated password reset.
#[derive(Debug)]
pub struct PasswordReset {
    email: EmailAddress,
    otp: String,
    password: String,
}

impl RequestSchema for ResetPasswordRequest {
    type Valid = PasswordReset;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let address = email(&mut errors, self.email);
        let otp = code(&mut errors, self.otp);
        let password = secret(&mut errors, "password", self.password);
        match (address, otp, password) {
            (Some(email), Some(otp), Some(password)) if errors.is_empty() => Ok(PasswordReset {
                email,
                otp,
                password,
            }),
            _ => Err(errors),
        }
    }
}

/// Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginOutcome),
        (status = 422, description = "Invalid credentials", body = ErrorsBody),
        (status = 429, description = "Too many attempts", body = ErrorsBody)
    ),
    tags = ["auth"],
    security([]),
    operation_id = "login"
)]
#[post("/auth/login")]
pub async fn login(state: web::Data<HttpState>, request: InboundRequest) -> HttpResponse {
    let endpoint = Endpoint::new("login")
        .accepts::<LoginRequest>()
        .throttled()
        .wrap_data();
    let auth = &state.auth;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            auth.login(call.take_payload()?).await
        })
        .await
}

/// Revoke every token issued to the caller.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageBody),
        (status = 403, description = "Permission denied", body = MessageBody)
    ),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/auth/logout")]
pub async fn logout(state: web::Data<HttpState>, request: InboundRequest) -> HttpResponse {
    let endpoint = Endpoint::new("logout")
        .require(Requirement::Authenticated)
        .message("Logged out successfully");
    let auth = &state.auth;
    state
        .pipeline
        .process(&endpoint, request, |call| async move {
            auth.logout(call.actor()?).await
        })
        .await
}

/// Exchange a current bearer token for a fresh one.
#[utoipa::path(
    post,
    path = "/api/v1/auth/token/refresh",
    responses(
        (status = 200, description = "Token issued", body = LoginOutcome),
        (status = 403, description = "Permission denied", body = MessageBody)
    ),
    tags = ["auth"],
    operation_id = "refreshToken"
)]
#[post("/auth/token/refresh")]
pub async fn refresh_token(state: web::Data<HttpState>, request: InboundRequest) -> HttpResponse {
    let endpoint = Endpoint::new("refresh_token")
        .require(Requirement::Authenticated)
        .wrap_data();
    let auth = &state.auth;
    state
        .pipeline
        .process(&endpoint, request, |call| async move {
            auth.refresh(call.actor()?).await
        })
        .await
}

/// Create a regular account and log it in.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = LoginOutcome),
        (status = 400, description = "Email already registered", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody),
        (status = 429, description = "Too many attempts", body = ErrorsBody)
    ),
    tags = ["auth"],
    security([]),
    operation_id = "signup"
)]
#[post("/auth/signup")]
pub async fn signup(state: web::Data<HttpState>, request: InboundRequest) -> HttpResponse {
    let endpoint = Endpoint::new("signup")
        .accepts::<SignupRequest>()
        .throttled()
        .status(StatusCode::CREATED)
        .wrap_data()
        .message("Account was created successfully");
    let auth = &state.auth;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            auth.register(call.take_payload()?).await
        })
        .await
}

/// Send a fresh signup verification code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup/resend-otp",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code sent", body = MessageBody),
        (status = 400, description = "Email already verified", body = MessageBody),
        (status = 404, description = "Unknown account", body = MessageBody),
        (status = 429, description = "Too many attempts", body = ErrorsBody)
    ),
    tags = ["auth"],
    security([]),
    operation_id = "resendSignupOtp"
)]
#[post("/auth/signup/resend-otp")]
pub async fn resend_signup_otp(
    state: web::Data<HttpState>,
    request: InboundRequest,
) -> HttpResponse {
    let endpoint = Endpoint::new("resend_signup_otp")
        .accepts::<EmailRequest>()
        .throttled()
        .message("Verification code sent");
    let otp = &state.otp;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let email = call.take_payload()?;
            otp.request_otp(&email, OtpPurpose::SignupVerification).await
        })
        .await
}

/// Confirm the signup email with a one-time code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/signup/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Email verified", body = MessageBody),
        (status = 400, description = "Expired or wrong code", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody)
    ),
    tags = ["auth"],
    security([]),
    operation_id = "verifySignupOtp"
)]
#[post("/auth/signup/verify-otp")]
pub async fn verify_signup_otp(
    state: web::Data<HttpState>,
    request: InboundRequest,
) -> HttpResponse {
    let endpoint = Endpoint::new("verify_signup_otp")
        .accepts::<VerifyOtpRequest>()
        .message("Email verified successfully");
    let otp = &state.otp;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let (email, code) = call.take_payload()?;
            otp.verify_signup_otp(&email, &code).await
        })
        .await
}

/// Send a password reset code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/password/forgot",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code sent when the account exists", body = MessageBody),
        (status = 429, description = "Too many attempts", body = ErrorsBody)
    ),
    tags = ["auth"],
    security([]),
    operation_id = "forgotPassword"
)]
#[post("/auth/password/forgot")]
pub async fn forgot_password(
    state: web::Data<HttpState>,
    request: InboundRequest,
) -> HttpResponse {
    let endpoint = Endpoint::new("forgot_password")
        .accepts::<EmailRequest>()
        .throttled()
        .message("Password reset code sent");
    let otp = &state.otp;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let email = call.take_payload()?;
            otp.request_password_reset(&email).await
        })
        .await
}

/// Replace a forgotten password using a reset code.
#[utoipa::path(
    post,
    path = "/api/v1/auth/password/reset",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = MessageBody),
        (status = 400, description = "Expired or wrong code", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody)
    ),
    tags = ["auth"],
    security([]),
    operation_id = "resetPassword"
)]
#[post("/auth/password/reset")]
pub async fn reset_password(
    state: web::Data<HttpState>,
    request: InboundRequest,
) -> HttpResponse {
    let endpoint = Endpoint::new("reset_password")
        .accepts::<ResetPasswordRequest>()
        .message("Password reset successfully");
    let otp = &state.otp;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let reset = call.take_payload()?;
            otp.reset_password(&reset.email, &reset.otp, &reset.password)
                .await
        })
        .await
}
