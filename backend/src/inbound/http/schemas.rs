//! OpenAPI schema definitions for domain types.
//!
//! Persisted domain entities do not derive `ToSchema`. The wrappers here
//! describe their rendered JSON shape for the OpenAPI document and live in the
//! inbound adapter layer where framework concerns belong.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::User`] as rendered by the account
/// endpoints.
#[derive(ToSchema)]
#[schema(as = crate::domain::User)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct UserSchema {
    #[schema(example = 4)]
    id: u64,
    #[schema(example = "Ada")]
    first_name: String,
    #[schema(example = "Lovelace")]
    last_name: String,
    #[schema(example = "ada@example.com")]
    email: String,
    phone: Option<String>,
    #[schema(example = "Regular User")]
    user_type: String,
    roles: Vec<String>,
    permissions: Vec<String>,
    is_active: bool,
    email_verified: bool,
    /// RFC 3339 timestamp of the last successful login.
    last_login: Option<String>,
    created_at: String,
    updated_at: String,
}

/// OpenAPI schema for [`crate::domain::Stock`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Stock)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct StockSchema {
    #[schema(example = 1)]
    id: u64,
    /// Upper-cased ticker symbol.
    #[schema(example = "AAPL")]
    symbol: String,
    #[schema(example = "Apple Inc.")]
    name: String,
    #[schema(example = "NASDAQ")]
    exchange: String,
    created_by: Option<u64>,
    created_at: String,
    updated_by: Option<u64>,
    updated_at: String,
}

/// OpenAPI schema for [`crate::domain::Subscription`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Subscription)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct SubscriptionSchema {
    id: u64,
    user_id: u64,
    stock_id: u64,
    /// Polling interval in seconds.
    #[schema(example = 60)]
    frequency: u32,
    active: bool,
    created_at: String,
}

/// OpenAPI schema for [`crate::domain::Alert`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Alert)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct AlertSchema {
    id: u64,
    user_id: u64,
    stock_id: u64,
    /// Two-decimal price rendered as a string.
    #[schema(example = "187.25")]
    threshold_price: String,
    triggered: bool,
    triggered_at: Option<String>,
    created_at: String,
}

/// OpenAPI schema for a page-number pagination window.
#[derive(ToSchema)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct PageSchema {
    #[schema(example = 10)]
    page_size: u32,
    #[schema(example = 1)]
    current_page: u32,
    #[schema(example = 3)]
    last_page: u32,
    #[schema(example = 25)]
    total: u64,
    #[schema(example = "/api/v1/stocks?page=2")]
    next_page_url: Option<String>,
    prev_page_url: Option<String>,
    /// Rows of the current page.
    #[schema(value_type = Vec<Object>)]
    data: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::PartialSchema;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    fn property_names(schema: &RefOr<Schema>) -> Vec<String> {
        match schema {
            RefOr::T(Schema::Object(object)) => object.properties.keys().cloned().collect(),
            _ => panic!("expected object schema"),
        }
    }

    #[rstest]
    fn user_schema_omits_credentials() {
        let fields = property_names(&UserSchema::schema());
        assert!(fields.iter().any(|field| field == "email"));
        assert!(!fields.iter().any(|field| field == "password_hash"));
        assert!(!fields.iter().any(|field| field == "token_version"));
    }

    #[rstest]
    #[case(StockSchema::schema(), "symbol")]
    #[case(SubscriptionSchema::schema(), "frequency")]
    #[case(AlertSchema::schema(), "threshold_price")]
    #[case(PageSchema::schema(), "last_page")]
    fn schemas_describe_rendered_fields(#[case] schema: RefOr<Schema>, #[case] field: &str) {
        assert!(property_names(&schema).iter().any(|name| name == field));
    }
}
