//! Account endpoints.
//!
//! ```text
//! GET    /api/v1/account/me
//! GET    /api/v1/account/users?keyword=ada&page=1&page_size=10
//! PATCH  /api/v1/account/users/{id} {"first_name":"Ada"}
//! PUT    /api/v1/account/users/{id}/access {"permissions":["stock.add_stock"]}
//! ```
//!
//! Responses project users through [`USER_FIELDS`] so credential material
//! never leaves the service.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use serde::Deserialize;
use utoipa::ToSchema;

use super::envelope::{ErrorsBody, MessageBody, ResponseSchema};
use super::pipeline::Endpoint;
use super::request::InboundRequest;
use super::schemas::{PageSchema, UserSchema};
use super::state::HttpState;
use super::validation::{RequestSchema, checked, optional, required, secret};
use crate::domain::{
    AccessGrant, EmailAddress, FieldErrors, Freshness, NewUserDraft, PersonName, Requirement,
    UserChanges, UserId, UserType,
};

/// Fields of a user exposed by the API.
pub const USER_FIELDS: &[&str] = &[
    "id",
    "first_name",
    "last_name",
    "email",
    "phone",
    "user_type",
    "roles",
    "permissions",
    "is_active",
    "email_verified",
    "last_login",
    "created_at",
    "updated_at",
];

const ONE_USER: ResponseSchema = ResponseSchema::one(USER_FIELDS);

fn person_name(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<String>,
) -> Option<PersonName> {
    let text = required(errors, field, value)?;
    checked(errors, field, PersonName::new(text))
}

/// Operator-created account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Login address.
    #[schema(example = "grace@example.com")]
    pub email: Option<String>,
    /// Optional contact number.
    pub phone: Option<String>,
    /// Defaults to a regular user.
    #[schema(value_type = Option<String>, example = "Regular User")]
    pub user_type: Option<UserType>,
    /// Initial password.
    pub password: Option<String>,
}

impl RequestSchema for CreateUserRequest {
    type Valid = NewUserDraft;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let first_name = person_name(&mut errors, "first_name", self.first_name);
        let last_name = person_name(&mut errors, "last_name", self.last_name);
        let email = required(&mut errors, "email", self.email)
            .and_then(|text| checked(&mut errors, "email", EmailAddress::new(text)));
        let password = secret(&mut errors, "password", self.password);
        match (first_name, last_name, email, password) {
            (Some(first_name), Some(last_name), Some(email), Some(password))
                if errors.is_empty() =>
            {
                Ok(NewUserDraft {
                    first_name,
                    last_name,
                    email,
                    phone: optional(self.phone),
                    user_type: self.user_type.unwrap_or(UserType::RegularUser),
                    password,
                })
            }
            _ => Err(errors),
        }
    }
}

/// Profile changes; absent fields stay as they are.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    /// New given name.
    pub first_name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
}

impl RequestSchema for UpdateUserRequest {
    type Valid = UserChanges;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let mut rename = |field: &str, value: Option<String>| {
            value.and_then(|text| person_name(&mut errors, field, Some(text)))
        };
        let changes = UserChanges {
            first_name: rename("first_name", self.first_name),
            last_name: rename("last_name", self.last_name),
        };
        errors.into_result().map(|()| changes)
    }
}

const INVALID_NAME: &str = "Names must be non-empty and contain no spaces.";

fn access_names(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<Vec<String>>,
) -> Option<Vec<String>> {
    let names: Vec<String> = value?.iter().map(|name| name.trim().to_owned()).collect();
    if names
        .iter()
        .any(|name| name.is_empty() || name.chars().any(char::is_whitespace))
    {
        errors.push(field, INVALID_NAME);
        return None;
    }
    Some(names)
}

/// Role and permission assignment; absent lists stay as they are.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AccessRequest {
    /// Role names replacing the current ones.
    pub roles: Option<Vec<String>>,
    /// Permission names replacing the current ones.
    pub permissions: Option<Vec<String>>,
}

impl RequestSchema for AccessRequest {
    type Valid = AccessGrant;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let grant = AccessGrant {
            roles: access_names(&mut errors, "roles", self.roles),
            permissions: access_names(&mut errors, "permissions", self.permissions),
        };
        errors.into_result().map(|()| grant)
    }
}

/// Password change for the caller.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    /// Password in use today.
    pub current_password: Option<String>,
    /// Replacement password.
    pub new_password: Option<String>,
}

impl RequestSchema for ChangePasswordRequest {
    type Valid = (String, String);

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let current = secret(&mut errors, "current_password", self.current_password);
        let replacement = secret(&mut errors, "new_password", self.new_password);
        current.zip(replacement).ok_or(errors)
    }
}

/// List accounts other than the caller, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/account/users",
    params(
        ("keyword" = Option<String>, Query, description = "Matches names and email"),
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("page_size" = Option<u64>, Query, description = "Rows per page")
    ),
    responses(
        (status = 200, description = "Page of users", body = PageSchema),
        (status = 403, description = "Permission denied", body = MessageBody)
    ),
    tags = ["account"],
    operation_id = "listUsers"
)]
#[get("/account/users")]
pub async fn list_users(state: web::Data<HttpState>, request: InboundRequest) -> HttpResponse {
    let endpoint = Endpoint::new("list_users")
        .require(Requirement::super_admin())
        .schema(ResponseSchema::page(USER_FIELDS));
    let users = &state.users;
    state
        .pipeline
        .process(&endpoint, request, |call| async move {
            let page = call.page_request();
            let slice = users
                .fetch_paginated_list(call.actor()?, call.query_param("keyword"), page)
                .await?;
            Ok(call.window(slice, page))
        })
        .await
}

/// Create an account on behalf of an operator.
#[utoipa::path(
    post,
    path = "/api/v1/account/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created", body = UserSchema),
        (status = 400, description = "Email already registered", body = MessageBody),
        (status = 403, description = "Permission denied", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody)
    ),
    tags = ["account"],
    operation_id = "createUser"
)]
#[post("/account/users")]
pub async fn create_user(state: web::Data<HttpState>, request: InboundRequest) -> HttpResponse {
    let endpoint = Endpoint::new("create_user")
        .accepts::<CreateUserRequest>()
        .require(Requirement::super_admin())
        .status(StatusCode::CREATED)
        .schema(ONE_USER)
        .wrap_data();
    let users = &state.users;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let draft = call.take_payload()?;
            users.create_single(Some(call.actor()?), draft).await
        })
        .await
}

/// Fetch one account.
#[utoipa::path(
    get,
    path = "/api/v1/account/users/{id}",
    params(("id" = u64, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User", body = UserSchema),
        (status = 403, description = "Permission denied", body = MessageBody),
        (status = 404, description = "Unknown user", body = MessageBody)
    ),
    tags = ["account"],
    operation_id = "getUser"
)]
#[get("/account/users/{id}")]
pub async fn get_user(
    state: web::Data<HttpState>,
    path: web::Path<u64>,
    request: InboundRequest,
) -> HttpResponse {
    let id = UserId::new(path.into_inner());
    let endpoint = Endpoint::new("get_user")
        .require(Requirement::Authenticated)
        .schema(ONE_USER)
        .wrap_data();
    let users = &state.users;
    state
        .pipeline
        .process(&endpoint, request, |call| async move {
            users
                .fetch_single_by_id(call.actor()?, id, Freshness::AllowCached)
                .await
        })
        .await
}

/// Rename an account.
#[utoipa::path(
    patch,
    path = "/api/v1/account/users/{id}",
    params(("id" = u64, Path, description = "User identifier")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = UserSchema),
        (status = 403, description = "Permission denied", body = MessageBody),
        (status = 404, description = "Unknown user", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody)
    ),
    tags = ["account"],
    operation_id = "updateUser"
)]
#[patch("/account/users/{id}")]
pub async fn update_user(
    state: web::Data<HttpState>,
    path: web::Path<u64>,
    request: InboundRequest,
) -> HttpResponse {
    let id = UserId::new(path.into_inner());
    let endpoint = Endpoint::new("update_user")
        .accepts::<UpdateUserRequest>()
        .require(Requirement::Authenticated)
        .schema(ONE_USER)
        .wrap_data();
    let users = &state.users;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let changes = call.take_payload()?;
            users.update_single(call.actor()?, id, changes).await
        })
        .await
}

/// Replace the roles and permissions of an account.
#[utoipa::path(
    put,
    path = "/api/v1/account/users/{id}/access",
    params(("id" = u64, Path, description = "User identifier")),
    request_body = AccessRequest,
    responses(
        (status = 200, description = "Updated user", body = UserSchema),
        (status = 403, description = "Permission denied", body = MessageBody),
        (status = 404, description = "Unknown user", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody)
    ),
    tags = ["account"],
    operation_id = "grantAccess"
)]
#[put("/account/users/{id}/access")]
pub async fn grant_access(
    state: web::Data<HttpState>,
    path: web::Path<u64>,
    request: InboundRequest,
) -> HttpResponse {
    let id = UserId::new(path.into_inner());
    let endpoint = Endpoint::new("grant_access")
        .accepts::<AccessRequest>()
        .require(Requirement::super_admin())
        .schema(ONE_USER)
        .wrap_data();
    let users = &state.users;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let grant = call.take_payload()?;
            users.grant_access(call.actor()?, id, grant).await
        })
        .await
}

/// Soft delete an account.
#[utoipa::path(
    delete,
    path = "/api/v1/account/users/{id}",
    params(("id" = u64, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Account deleted", body = MessageBody),
        (status = 400, description = "Cannot delete yourself", body = MessageBody),
        (status = 403, description = "Permission denied", body = MessageBody),
        (status = 404, description = "Unknown user", body = MessageBody)
    ),
    tags = ["account"],
    operation_id = "deleteUser"
)]
#[delete("/account/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    path: web::Path<u64>,
    request: InboundRequest,
) -> HttpResponse {
    let id = UserId::new(path.into_inner());
    let endpoint = Endpoint::new("delete_user")
        .require(Requirement::super_admin())
        .message("User deleted successfully");
    let users = &state.users;
    state
        .pipeline
        .process(&endpoint, request, |call| async move {
            users.delete_single(call.actor()?, id).await
        })
        .await
}

/// The caller's own account.
#[utoipa::path(
    get,
    path = "/api/v1/account/me",
    responses(
        (status = 200, description = "Caller's account", body = UserSchema),
        (status = 403, description = "Permission denied", body = MessageBody)
    ),
    tags = ["account"],
    operation_id = "currentUser"
)]
#[get("/account/me")]
pub async fn current_user(state: web::Data<HttpState>, request: InboundRequest) -> HttpResponse {
    let endpoint = Endpoint::new("current_user")
        .require(Requirement::Authenticated)
        .schema(ONE_USER)
        .wrap_data()
        .unaudited();
    let users = &state.users;
    state
        .pipeline
        .process(&endpoint, request, |call| async move {
            let actor = call.actor()?;
            users
                .fetch_single_by_id(actor, actor.user_id, Freshness::AllowCached)
                .await
        })
        .await
}

/// Replace the caller's password.
#[utoipa::path(
    post,
    path = "/api/v1/account/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageBody),
        (status = 400, description = "Current password is wrong", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody)
    ),
    tags = ["account"],
    operation_id = "changePassword"
)]
#[post("/account/password")]
pub async fn change_password(
    state: web::Data<HttpState>,
    request: InboundRequest,
) -> HttpResponse {
    let endpoint = Endpoint::new("change_password")
        .accepts::<ChangePasswordRequest>()
        .require(Requirement::Authenticated)
        .message("Password changed successfully");
    let users = &state.users;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let (current, replacement) = call.take_payload()?;
            users
                .change_password(call.actor()?, &current, &replacement)
                .await
        })
        .await
}

#[cfg(test)]
mod tests {
    //! Payload validation for the account bodies.
    use super::*;
    use crate::inbound::http::validation::{REQUIRED, parse_payload};
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn update_ignores_absent_fields() {
        let changes =
            parse_payload::<UpdateUserRequest>(json!({"last_name": "Byron"})).expect("valid");
        assert!(changes.first_name.is_none());
        assert_eq!(changes.last_name.map(String::from).as_deref(), Some("Byron"));
    }

    #[rstest]
    fn update_rejects_blank_names() {
        let errors =
            parse_payload::<UpdateUserRequest>(json!({"first_name": "  "})).expect_err("blank");
        assert_eq!(errors.get("first_name"), Some(&[REQUIRED.to_owned()][..]));
    }

    #[rstest]
    fn access_names_are_trimmed() {
        let grant = parse_payload::<AccessRequest>(json!({"permissions": [" stock.add_stock "]}))
            .expect("valid grant");
        assert!(grant.roles.is_none());
        assert_eq!(grant.permissions, Some(vec!["stock.add_stock".to_owned()]));
    }

    #[rstest]
    #[case(json!({"roles": [""]}), "roles")]
    #[case(json!({"permissions": ["add stock"]}), "permissions")]
    fn access_names_reject_blanks_and_spaces(#[case] body: serde_json::Value, #[case] field: &str) {
        let errors = parse_payload::<AccessRequest>(body).expect_err("invalid name");
        assert_eq!(errors.get(field), Some(&[INVALID_NAME.to_owned()][..]));
    }

    #[rstest]
    fn created_users_default_to_regular() {
        let draft = parse_payload::<CreateUserRequest>(json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "email": "grace@example.com",
            "password": "Sup3r$ecret",
        }))
        .expect("valid user");
        assert_eq!(draft.user_type, UserType::RegularUser);
        assert!(draft.phone.is_none());
    }

    #[rstest]
    #[case("Super Admin", true)]
    #[case("Wizard", false)]
    fn user_type_is_parsed_by_label(#[case] label: &str, #[case] accepted: bool) {
        let parsed = parse_payload::<CreateUserRequest>(json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "email": "grace@example.com",
            "password": "Sup3r$ecret",
            "user_type": label,
        }));
        assert_eq!(parsed.is_ok(), accepted);
    }

    #[rstest]
    fn password_change_needs_both_values() {
        let errors = parse_payload::<ChangePasswordRequest>(json!({"current_password": "x"}))
            .expect_err("missing replacement");
        assert_eq!(errors.get("new_password"), Some(&[REQUIRED.to_owned()][..]));
    }
}
