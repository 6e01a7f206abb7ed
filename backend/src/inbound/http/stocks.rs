//! Stock, subscription and alert endpoints.
//!
//! ```text
//! GET    /api/v1/stocks?keyword=app&page=1
//! POST   /api/v1/stocks {"symbol":"aapl","name":"Apple Inc.","exchange":"NASDAQ"}
//! GET    /api/v1/stocks/by-symbol/AAPL
//! POST   /api/v1/stocks/alerts {"symbol":"AAPL","threshold_price":"187.25"}
//! ```
//!
//! Subscription and alert routes are registered before `/stocks/{id}` so the
//! literal segments win.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, delete, get, patch, post, web};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::envelope::{ErrorsBody, MessageBody, ResponseSchema};
use super::pipeline::Endpoint;
use super::request::InboundRequest;
use super::schemas::{AlertSchema, PageSchema, StockSchema, SubscriptionSchema};
use super::state::HttpState;
use super::validation::{REQUIRED, RequestSchema, checked, optional, required};
use crate::domain::{
    AlertDraft, AlertId, Error, FieldErrors, Freshness, Price, Requirement, StockChanges,
    StockDraft, StockId, StockValidationError, SubscriptionDraft, SubscriptionId, Symbol,
    UserType,
};

/// Fields of a stock exposed by the API.
pub const STOCK_FIELDS: &[&str] = &[
    "id",
    "symbol",
    "name",
    "exchange",
    "created_by",
    "created_at",
    "updated_by",
    "updated_at",
];

/// Fields of a subscription exposed by the API.
pub const SUBSCRIPTION_FIELDS: &[&str] =
    &["id", "user_id", "stock_id", "frequency", "active", "created_at"];

/// Fields of an alert exposed by the API.
pub const ALERT_FIELDS: &[&str] = &[
    "id",
    "user_id",
    "stock_id",
    "threshold_price",
    "triggered",
    "triggered_at",
    "created_at",
];

/// Permission that lets non-operators register stocks.
pub const ADD_STOCK_PERMISSION: &str = "stock.add_stock";

const ONE_STOCK: ResponseSchema = ResponseSchema::one(STOCK_FIELDS);
const TEXT_MAX: usize = 100;

fn bounded(errors: &mut FieldErrors, field: &str, text: String) -> Option<String> {
    if text.chars().count() > TEXT_MAX {
        errors.push(
            field,
            format!("Ensure this field has no more than {TEXT_MAX} characters."),
        );
        return None;
    }
    Some(text)
}

fn ticker(errors: &mut FieldErrors, value: Option<String>) -> Option<Symbol> {
    let text = required(errors, "symbol", value)?;
    checked(errors, "symbol", Symbol::new(text))
}

/// Register a stock, or return the live one already holding the symbol.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateStockRequest {
    /// Ticker symbol, upper-cased on save.
    #[schema(example = "AAPL")]
    pub symbol: Option<String>,
    /// Company name.
    #[schema(example = "Apple Inc.")]
    pub name: Option<String>,
    /// Listing exchange.
    #[schema(example = "NASDAQ")]
    pub exchange: Option<String>,
}

impl RequestSchema for CreateStockRequest {
    type Valid = StockDraft;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let symbol = ticker(&mut errors, self.symbol);
        let name = required(&mut errors, "name", self.name)
            .and_then(|text| bounded(&mut errors, "name", text));
        let exchange = required(&mut errors, "exchange", self.exchange)
            .and_then(|text| bounded(&mut errors, "exchange", text));
        match (symbol, name, exchange) {
            (Some(symbol), Some(name), Some(exchange)) if errors.is_empty() => Ok(StockDraft {
                symbol,
                name,
                exchange,
            }),
            _ => Err(errors),
        }
    }
}

/// Name or exchange changes; absent fields stay as they are.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStockRequest {
    /// New company name.
    pub name: Option<String>,
    /// New listing exchange.
    pub exchange: Option<String>,
}

impl RequestSchema for UpdateStockRequest {
    type Valid = StockChanges;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let name = optional(self.name).and_then(|text| bounded(&mut errors, "name", text));
        let exchange =
            optional(self.exchange).and_then(|text| bounded(&mut errors, "exchange", text));
        errors
            .into_result()
            .map(|()| StockChanges { name, exchange })
    }
}

/// Follow a stock's price feed.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSubscriptionRequest {
    /// Symbol of the stock to follow.
    #[schema(example = "AAPL")]
    pub symbol: Option<String>,
    /// Update interval in seconds.
    #[schema(example = 60)]
    pub frequency: Option<u32>,
}

impl RequestSchema for CreateSubscriptionRequest {
    type Valid = SubscriptionDraft;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let symbol = ticker(&mut errors, self.symbol);
        if self.frequency.is_none() {
            errors.push("frequency", REQUIRED);
        }
        match (symbol, self.frequency) {
            (Some(symbol), Some(frequency)) if errors.is_empty() => {
                Ok(SubscriptionDraft { symbol, frequency })
            }
            _ => Err(errors),
        }
    }
}

/// Watch a stock for a price threshold.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAlertRequest {
    /// Symbol of the stock to watch.
    #[schema(example = "AAPL")]
    pub symbol: Option<String>,
    /// Trigger price as a decimal string or number.
    #[schema(value_type = Option<String>, example = "187.25")]
    pub threshold_price: Option<Value>,
}

fn price(errors: &mut FieldErrors, value: Option<Value>) -> Option<Price> {
    let text = match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Null) | None => None,
        Some(_) => {
            errors.push("threshold_price", StockValidationError::InvalidPrice.to_string());
            return None;
        }
    };
    let text = required(errors, "threshold_price", text)?;
    checked(errors, "threshold_price", text.parse::<Price>())
}

impl RequestSchema for CreateAlertRequest {
    type Valid = AlertDraft;

    fn validate(self) -> Result<Self::Valid, FieldErrors> {
        let mut errors = FieldErrors::default();
        let symbol = ticker(&mut errors, self.symbol);
        let threshold_price = price(&mut errors, self.threshold_price);
        match (symbol, threshold_price) {
            (Some(symbol), Some(threshold_price)) if errors.is_empty() => Ok(AlertDraft {
                symbol,
                threshold_price,
            }),
            _ => Err(errors),
        }
    }
}

/// List live stocks.
#[utoipa::path(
    get,
    path = "/api/v1/stocks",
    params(
        ("keyword" = Option<String>, Query, description = "Matches symbol and name"),
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("page_size" = Option<u64>, Query, description = "Rows per page")
    ),
    responses(
        (status = 200, description = "Page of stocks", body = PageSchema),
        (status = 403, description = "Permission denied", body = MessageBody)
    ),
    tags = ["stocks"],
    operation_id = "listStocks"
)]
#[get("/stocks")]
pub async fn list_stocks(state: web::Data<HttpState>, request: InboundRequest) -> HttpResponse {
    let endpoint = Endpoint::new("list_stocks")
        .require(Requirement::Authenticated)
        .schema(ResponseSchema::page(STOCK_FIELDS))
        .unaudited();
    let stocks = &state.stocks;
    state
        .pipeline
        .process(&endpoint, request, |call| async move {
            let page = call.page_request();
            let slice = stocks
                .fetch_stock_list(call.query_param("keyword"), page)
                .await?;
            Ok(call.window(slice, page))
        })
        .await
}

/// Register a stock.
#[utoipa::path(
    post,
    path = "/api/v1/stocks",
    request_body = CreateStockRequest,
    responses(
        (status = 201, description = "Stock registered", body = StockSchema),
        (status = 403, description = "Permission denied", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody)
    ),
    tags = ["stocks"],
    operation_id = "createStock"
)]
#[post("/stocks")]
pub async fn create_stock(state: web::Data<HttpState>, request: InboundRequest) -> HttpResponse {
    let endpoint = Endpoint::new("create_stock")
        .accepts::<CreateStockRequest>()
        .require(Requirement::PermissionOrUserType {
            permission: ADD_STOCK_PERMISSION.to_owned(),
            user_types: vec![UserType::SuperAdmin],
        })
        .status(StatusCode::CREATED)
        .schema(ONE_STOCK)
        .wrap_data();
    let stocks = &state.stocks;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let draft = call.take_payload()?;
            stocks.create_stock(call.actor()?, draft).await
        })
        .await
}

/// Look a stock up by ticker symbol, case-insensitively.
#[utoipa::path(
    get,
    path = "/api/v1/stocks/by-symbol/{symbol}",
    params(("symbol" = String, Path, description = "Ticker symbol")),
    responses(
        (status = 200, description = "Stock", body = StockSchema),
        (status = 404, description = "Unknown symbol", body = MessageBody)
    ),
    tags = ["stocks"],
    operation_id = "getStockBySymbol"
)]
#[get("/stocks/by-symbol/{symbol}")]
pub async fn get_stock_by_symbol(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    request: InboundRequest,
) -> HttpResponse {
    let raw = path.into_inner();
    let endpoint = Endpoint::new("get_stock_by_symbol")
        .require(Requirement::Authenticated)
        .schema(ONE_STOCK)
        .wrap_data()
        .unaudited();
    let stocks = &state.stocks;
    state
        .pipeline
        .process(&endpoint, request, |_call| async move {
            let symbol = Symbol::new(&raw).map_err(|_| Error::not_found("Stock not found"))?;
            stocks
                .find_stock_by_symbol(&symbol, Freshness::AllowCached)
                .await
        })
        .await
}

/// Fetch one stock.
#[utoipa::path(
    get,
    path = "/api/v1/stocks/{id}",
    params(("id" = u64, Path, description = "Stock identifier")),
    responses(
        (status = 200, description = "Stock", body = StockSchema),
        (status = 404, description = "Unknown stock", body = MessageBody)
    ),
    tags = ["stocks"],
    operation_id = "getStock"
)]
#[get("/stocks/{id}")]
pub async fn get_stock(
    state: web::Data<HttpState>,
    path: web::Path<u64>,
    request: InboundRequest,
) -> HttpResponse {
    let id = StockId::new(path.into_inner());
    let endpoint = Endpoint::new("get_stock")
        .require(Requirement::Authenticated)
        .schema(ONE_STOCK)
        .wrap_data()
        .unaudited();
    let stocks = &state.stocks;
    state
        .pipeline
        .process(&endpoint, request, |_call| async move {
            stocks.fetch_stock_by_id(id, Freshness::AllowCached).await
        })
        .await
}

/// Rename a stock or move it to another exchange.
#[utoipa::path(
    patch,
    path = "/api/v1/stocks/{id}",
    params(("id" = u64, Path, description = "Stock identifier")),
    request_body = UpdateStockRequest,
    responses(
        (status = 200, description = "Updated stock", body = StockSchema),
        (status = 403, description = "Permission denied", body = MessageBody),
        (status = 404, description = "Unknown stock", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody)
    ),
    tags = ["stocks"],
    operation_id = "updateStock"
)]
#[patch("/stocks/{id}")]
pub async fn update_stock(
    state: web::Data<HttpState>,
    path: web::Path<u64>,
    request: InboundRequest,
) -> HttpResponse {
    let id = StockId::new(path.into_inner());
    let endpoint = Endpoint::new("update_stock")
        .accepts::<UpdateStockRequest>()
        .require(Requirement::super_admin())
        .schema(ONE_STOCK)
        .wrap_data();
    let stocks = &state.stocks;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let changes = call.take_payload()?;
            stocks.update_stock(call.actor()?, id, changes).await
        })
        .await
}

/// Soft delete a stock.
#[utoipa::path(
    delete,
    path = "/api/v1/stocks/{id}",
    params(("id" = u64, Path, description = "Stock identifier")),
    responses(
        (status = 200, description = "Stock deleted", body = MessageBody),
        (status = 403, description = "Permission denied", body = MessageBody),
        (status = 404, description = "Unknown stock", body = MessageBody)
    ),
    tags = ["stocks"],
    operation_id = "deleteStock"
)]
#[delete("/stocks/{id}")]
pub async fn delete_stock(
    state: web::Data<HttpState>,
    path: web::Path<u64>,
    request: InboundRequest,
) -> HttpResponse {
    let id = StockId::new(path.into_inner());
    let endpoint = Endpoint::new("delete_stock")
        .require(Requirement::super_admin())
        .message("Stock deleted successfully");
    let stocks = &state.stocks;
    state
        .pipeline
        .process(&endpoint, request, |call| async move {
            stocks.delete_stock(call.actor()?, id).await
        })
        .await
}

/// Subscribe the caller to a stock.
#[utoipa::path(
    post,
    path = "/api/v1/stocks/subscriptions",
    request_body = CreateSubscriptionRequest,
    responses(
        (status = 201, description = "Subscribed", body = SubscriptionSchema),
        (status = 400, description = "Already subscribed", body = MessageBody),
        (status = 404, description = "Unknown symbol", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody)
    ),
    tags = ["stocks"],
    operation_id = "createSubscription"
)]
#[post("/stocks/subscriptions")]
pub async fn create_subscription(
    state: web::Data<HttpState>,
    request: InboundRequest,
) -> HttpResponse {
    let endpoint = Endpoint::new("create_subscription")
        .accepts::<CreateSubscriptionRequest>()
        .require(Requirement::Authenticated)
        .status(StatusCode::CREATED)
        .schema(ResponseSchema::one(SUBSCRIPTION_FIELDS))
        .wrap_data();
    let stocks = &state.stocks;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let draft = call.take_payload()?;
            stocks.create_subscription(call.actor()?, draft).await
        })
        .await
}

/// Cancel one of the caller's subscriptions.
#[utoipa::path(
    delete,
    path = "/api/v1/stocks/subscriptions/{id}",
    params(("id" = u64, Path, description = "Subscription identifier")),
    responses(
        (status = 200, description = "Subscription cancelled", body = MessageBody),
        (status = 403, description = "Permission denied", body = MessageBody),
        (status = 404, description = "Unknown subscription", body = MessageBody)
    ),
    tags = ["stocks"],
    operation_id = "deleteSubscription"
)]
#[delete("/stocks/subscriptions/{id}")]
pub async fn delete_subscription(
    state: web::Data<HttpState>,
    path: web::Path<u64>,
    request: InboundRequest,
) -> HttpResponse {
    let id = SubscriptionId::new(path.into_inner());
    let endpoint = Endpoint::new("delete_subscription")
        .require(Requirement::Authenticated)
        .message("Subscription deleted successfully");
    let stocks = &state.stocks;
    state
        .pipeline
        .process(&endpoint, request, |call| async move {
            stocks.delete_subscription(call.actor()?, id).await
        })
        .await
}

/// Register a price alert for the caller.
#[utoipa::path(
    post,
    path = "/api/v1/stocks/alerts",
    request_body = CreateAlertRequest,
    responses(
        (status = 201, description = "Alert registered", body = AlertSchema),
        (status = 404, description = "Unknown symbol", body = MessageBody),
        (status = 422, description = "Invalid payload", body = ErrorsBody)
    ),
    tags = ["stocks"],
    operation_id = "createAlert"
)]
#[post("/stocks/alerts")]
pub async fn create_alert(state: web::Data<HttpState>, request: InboundRequest) -> HttpResponse {
    let endpoint = Endpoint::new("create_alert")
        .accepts::<CreateAlertRequest>()
        .require(Requirement::Authenticated)
        .status(StatusCode::CREATED)
        .schema(ResponseSchema::one(ALERT_FIELDS))
        .wrap_data();
    let stocks = &state.stocks;
    state
        .pipeline
        .process(&endpoint, request, |mut call| async move {
            let draft = call.take_payload()?;
            stocks.create_alert(call.actor()?, draft).await
        })
        .await
}

/// Remove one of the caller's alerts.
#[utoipa::path(
    delete,
    path = "/api/v1/stocks/alerts/{id}",
    params(("id" = u64, Path, description = "Alert identifier")),
    responses(
        (status = 200, description = "Alert deleted", body = MessageBody),
        (status = 403, description = "Permission denied", body = MessageBody),
        (status = 404, description = "Unknown alert", body = MessageBody)
    ),
    tags = ["stocks"],
    operation_id = "deleteAlert"
)]
#[delete("/stocks/alerts/{id}")]
pub async fn delete_alert(
    state: web::Data<HttpState>,
    path: web::Path<u64>,
    request: InboundRequest,
) -> HttpResponse {
    let id = AlertId::new(path.into_inner());
    let endpoint = Endpoint::new("delete_alert")
        .require(Requirement::Authenticated)
        .message("Alert deleted successfully");
    let stocks = &state.stocks;
    state
        .pipeline
        .process(&endpoint, request, |call| async move {
            stocks.delete_alert(call.actor()?, id).await
        })
        .await
}
