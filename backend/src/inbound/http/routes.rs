//! REST route table.
//!
//! Every business endpoint lives under `/api/v1` and shares the path
//! extraction error handler, so malformed identifiers read as missing
//! resources.

use actix_web::{Scope, web};

use super::error::path_error;
use super::{auth, stocks, users};

/// Prefix of every REST endpoint.
pub const API_PREFIX: &str = "/api/v1";

/// Scope registering the authentication, account and stock endpoints.
///
/// Literal stock routes precede `/stocks/{id}`.
pub fn api_scope() -> Scope {
    web::scope(API_PREFIX)
        .app_data(web::PathConfig::default().error_handler(path_error))
        .service(auth::login)
        .service(auth::logout)
        .service(auth::refresh_token)
        .service(auth::signup)
        .service(auth::resend_signup_otp)
        .service(auth::verify_signup_otp)
        .service(auth::forgot_password)
        .service(auth::reset_password)
        .service(users::current_user)
        .service(users::change_password)
        .service(users::list_users)
        .service(users::create_user)
        .service(users::get_user)
        .service(users::update_user)
        .service(users::grant_access)
        .service(users::delete_user)
        .service(stocks::list_stocks)
        .service(stocks::create_stock)
        .service(stocks::get_stock_by_symbol)
        .service(stocks::create_subscription)
        .service(stocks::delete_subscription)
        .service(stocks::create_alert)
        .service(stocks::delete_alert)
        .service(stocks::get_stock)
        .service(stocks::update_stock)
        .service(stocks::delete_stock)
}
