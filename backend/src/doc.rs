//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every REST endpoint of the inbound layer together with
//! the schema wrappers describing rendered entities, the envelope bodies and
//! the bearer token security scheme. Swagger UI serves it in debug builds.

use crate::domain::LoginOutcome;
use crate::inbound::http::auth::{
    EmailRequest, LoginRequest, ResetPasswordRequest, SignupRequest, VerifyOtpRequest,
};
use crate::inbound::http::envelope::{ErrorsBody, FaultBody, MessageBody};
use crate::inbound::http::health::HealthBody;
use crate::inbound::http::schemas::{
    AlertSchema, PageSchema, StockSchema, SubscriptionSchema, UserSchema,
};
use crate::inbound::http::stocks::{
    CreateAlertRequest, CreateStockRequest, CreateSubscriptionRequest, UpdateStockRequest,
};
use crate::inbound::http::users::{
    AccessRequest, ChangePasswordRequest, CreateUserRequest, UpdateUserRequest,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "BearerToken",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .description(Some("Access token issued by POST /api/v1/auth/login."))
                    .build(),
            ),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Stockdesk API",
        description = "Accounts, stock catalogue, subscriptions and price alerts."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("BearerToken" = [])),
    paths(
        crate::inbound::http::auth::login,
        crate::inbound::http::auth::logout,
        crate::inbound::http::auth::refresh_token,
        crate::inbound::http::auth::signup,
        crate::inbound::http::auth::resend_signup_otp,
        crate::inbound::http::auth::verify_signup_otp,
        crate::inbound::http::auth::forgot_password,
        crate::inbound::http::auth::reset_password,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::create_user,
        crate::inbound::http::users::get_user,
        crate::inbound::http::users::update_user,
        crate::inbound::http::users::grant_access,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::users::current_user,
        crate::inbound::http::users::change_password,
        crate::inbound::http::stocks::list_stocks,
        crate::inbound::http::stocks::create_stock,
        crate::inbound::http::stocks::get_stock_by_symbol,
        crate::inbound::http::stocks::get_stock,
        crate::inbound::http::stocks::update_stock,
        crate::inbound::http::stocks::delete_stock,
        crate::inbound::http::stocks::create_subscription,
        crate::inbound::http::stocks::delete_subscription,
        crate::inbound::http::stocks::create_alert,
        crate::inbound::http::stocks::delete_alert,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        UserSchema,
        StockSchema,
        SubscriptionSchema,
        AlertSchema,
        PageSchema,
        LoginOutcome,
        MessageBody,
        ErrorsBody,
        FaultBody,
        HealthBody,
        LoginRequest,
        SignupRequest,
        EmailRequest,
        VerifyOtpRequest,
        ResetPasswordRequest,
        CreateUserRequest,
        UpdateUserRequest,
        AccessRequest,
        ChangePasswordRequest,
        CreateStockRequest,
        UpdateStockRequest,
        CreateSubscriptionRequest,
        CreateAlertRequest,
    )),
    tags(
        (name = "auth", description = "Login, signup and one-time passcodes"),
        (name = "account", description = "Account administration and self-service"),
        (name = "stocks", description = "Stock catalogue, subscriptions and alerts"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
