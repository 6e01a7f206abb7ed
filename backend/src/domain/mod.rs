//! Domain primitives, services and ports.
//!
//! Purpose: define strongly typed entities and the business operations over
//! them. Services return [`OperationResult`] and talk to the outside world
//! only through the traits in [`ports`].
//!
//! Public surface:
//! - `Error`/`ErrorCode`/`FieldErrors`: transport-agnostic failures.
//! - `CachedLookup`: cache-through lookups shared by services.
//! - `Requirement`: declarative endpoint authorization.
//! - `UserService`, `AuthService`, `OtpService`, `StockService`: operations.

pub mod activity;
pub mod audit;
pub mod auth;
pub mod authorization;
pub mod cache;
pub mod error;
pub mod ids;
pub mod ports;
pub mod stock;
pub mod trace_id;
pub mod user;

mod auth_service;
mod otp_service;
#[cfg(test)]
pub(crate) mod service_fixtures;
mod stock_service;
mod user_service;

pub use self::activity::{ActivityType, report_activity};
pub use self::audit::{
    AuditCompletion, AuditEntry, AuditJob, AuditRequest, AuditStatus, REF_ID_DIGITS, RefId,
};
pub use self::auth::{
    LoginCredentials, OTP_LENGTH, OTP_MAX_ATTEMPTS, OtpChallenge, OtpPurpose, PasswordPolicy,
    Principal,
};
pub use self::auth_service::{AuthService, LoginOutcome, Registration};
pub use self::authorization::Requirement;
pub use self::cache::{CachedLookup, Freshness};
pub use self::error::{
    Error, ErrorCode, FieldErrors, NON_FIELD_ERRORS, OperationResult, PERMISSION_DENIED,
};
pub use self::ids::{AlertId, StockId, SubscriptionId, UserId};
pub use self::otp_service::{OtpService, OtpSettings};
pub use self::stock::{
    Alert, NewAlert, NewStock, NewSubscription, Price, SYMBOL_MAX, Stock, StockChanges,
    StockListFilter, StockValidationError, Subscription, Symbol,
};
pub use self::stock_service::{AlertDraft, StockDraft, StockService, SubscriptionDraft};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{
    EmailAddress, NAME_MAX, NewUser, PasswordHash, PersonName, User, UserListFilter, UserType,
    UserValidationError,
};
pub use self::user_service::{AccessGrant, NewUserDraft, UserChanges, UserService};
