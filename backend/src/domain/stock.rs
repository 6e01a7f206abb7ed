//! Tracked stocks, subscriptions to their price feed and price alerts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use utoipa::ToSchema;

use super::{AlertId, StockId, SubscriptionId, UserId};

/// Maximum length of a ticker symbol.
pub const SYMBOL_MAX: usize = 10;

/// Validation errors raised by stock value constructors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StockValidationError {
    /// Symbol is blank or contains whitespace.
    #[error("Enter a valid ticker symbol.")]
    InvalidSymbol,
    /// Symbol exceeds [`SYMBOL_MAX`] characters.
    #[error("Ensure this field has no more than {max} characters.")]
    SymbolTooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// Price is not a non-negative decimal with at most two places.
    #[error("Enter a valid price with at most 2 decimal places.")]
    InvalidPrice,
}

/// Upper-cased ticker symbol.
///
/// Lookups by symbol are case-insensitive because symbols are normalised on
/// construction.
///
/// # Examples
/// ```
/// use stockdesk::domain::Symbol;
///
/// assert_eq!(Symbol::new(" aapl ").expect("symbol").as_ref(), "AAPL");
/// assert!(Symbol::new("BRK A").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "AAPL")]
pub struct Symbol(String);

impl Symbol {
    /// Validate and normalise a ticker symbol.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, StockValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(StockValidationError::InvalidSymbol);
        }
        if trimmed.chars().count() > SYMBOL_MAX {
            return Err(StockValidationError::SymbolTooLong { max: SYMBOL_MAX });
        }
        Ok(Self(trimmed.to_uppercase()))
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = StockValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

/// Non-negative price with two decimal places, stored in cents.
///
/// Serialises as a decimal string (`"123.40"`) and accepts either a string or
/// a JSON number on input.
///
/// # Examples
/// ```
/// use stockdesk::domain::Price;
///
/// let price: Price = "101.5".parse().expect("price");
/// assert_eq!(price.cents(), 10_150);
/// assert_eq!(price.to_string(), "101.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ToSchema)]
#[schema(value_type = String, example = "187.25")]
pub struct Price(u64);

/// Largest accepted price, matching a ten-digit decimal column.
const PRICE_MAX_CENTS: u64 = 9_999_999_999;

impl Price {
    /// Price from a cent amount.
    pub fn from_cents(cents: u64) -> Result<Self, StockValidationError> {
        if cents > PRICE_MAX_CENTS {
            return Err(StockValidationError::InvalidPrice);
        }
        Ok(Self(cents))
    }

    /// Amount in cents.
    pub const fn cents(self) -> u64 {
        self.0
    }
}

impl FromStr for Price {
    type Err = StockValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if whole.is_empty() || !digits_only(whole) || !digits_only(fraction) || fraction.len() > 2
        {
            return Err(StockValidationError::InvalidPrice);
        }
        let whole: u64 = whole
            .parse()
            .map_err(|_| StockValidationError::InvalidPrice)?;
        let fraction_cents: u64 = format!("{fraction:0<2}")
            .parse()
            .map_err(|_| StockValidationError::InvalidPrice)?;
        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(fraction_cents))
            .ok_or(StockValidationError::InvalidPrice)?;
        Self::from_cents(cents)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0.div_euclid(100), self.0.rem_euclid(100))
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }
        let text = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text,
            Raw::Number(number) => number.to_string(),
        };
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Tracked stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    /// Primary key.
    pub id: StockId,
    /// Unique ticker symbol.
    pub symbol: Symbol,
    /// Company name.
    pub name: String,
    /// Listing exchange.
    pub exchange: String,
    /// Creating account.
    pub created_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modifying account.
    pub updated_by: Option<UserId>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Soft deletion time.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Deleting account.
    pub deleted_by: Option<UserId>,
}

impl Stock {
    /// Whether the stock has been soft deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields required to create a stock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStock {
    /// Ticker symbol.
    pub symbol: Symbol,
    /// Company name.
    pub name: String,
    /// Listing exchange.
    pub exchange: String,
    /// Creating account.
    pub created_by: Option<UserId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl NewStock {
    /// Materialise the stored stock under `id`.
    pub fn into_stock(self, id: StockId) -> Stock {
        Stock {
            id,
            symbol: self.symbol,
            name: self.name,
            exchange: self.exchange,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_by: None,
            updated_at: self.created_at,
            deleted_at: None,
            deleted_by: None,
        }
    }
}

/// Optional changes applied by a stock update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockChanges {
    /// New company name.
    pub name: Option<String>,
    /// New listing exchange.
    pub exchange: Option<String>,
}

/// Keyword filter for stock listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockListFilter {
    /// Case-insensitive match on name or symbol.
    pub keyword: Option<String>,
}

impl StockListFilter {
    /// Whether `stock` passes the filter. Deleted stocks never do.
    pub fn matches(&self, stock: &Stock) -> bool {
        if stock.is_deleted() {
            return false;
        }
        self.keyword
            .as_deref()
            .map(str::to_lowercase)
            .is_none_or(|keyword| {
                stock.name.to_lowercase().contains(&keyword)
                    || stock.symbol.as_ref().to_lowercase().contains(&keyword)
            })
    }
}

/// A user's subscription to price updates for a stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Primary key.
    pub id: SubscriptionId,
    /// Subscribing account.
    pub user_id: UserId,
    /// Subscribed stock.
    pub stock_id: StockId,
    /// Update interval in seconds.
    pub frequency: u32,
    /// Whether updates are currently delivered.
    pub active: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Soft deletion time.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Deleting account.
    pub deleted_by: Option<UserId>,
}

/// Fields required to create a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    /// Subscribing account.
    pub user_id: UserId,
    /// Subscribed stock.
    pub stock_id: StockId,
    /// Update interval in seconds.
    pub frequency: u32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl NewSubscription {
    /// Materialise the stored subscription under `id`.
    pub fn into_subscription(self, id: SubscriptionId) -> Subscription {
        Subscription {
            id,
            user_id: self.user_id,
            stock_id: self.stock_id,
            frequency: self.frequency,
            active: true,
            created_at: self.created_at,
            deleted_at: None,
            deleted_by: None,
        }
    }
}

/// Price threshold alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Primary key.
    pub id: AlertId,
    /// Owning account.
    pub user_id: UserId,
    /// Watched stock.
    pub stock_id: StockId,
    /// Price that triggers the alert.
    pub threshold_price: Price,
    /// Whether the threshold has been crossed.
    pub triggered: bool,
    /// When the threshold was crossed.
    pub triggered_at: Option<DateTime<Utc>>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Soft deletion time.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Deleting account.
    pub deleted_by: Option<UserId>,
}

/// Fields required to create an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    /// Owning account.
    pub user_id: UserId,
    /// Watched stock.
    pub stock_id: StockId,
    /// Trigger price.
    pub threshold_price: Price,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl NewAlert {
    /// Materialise the stored alert under `id`.
    pub fn into_alert(self, id: AlertId) -> Alert {
        Alert {
            id,
            user_id: self.user_id,
            stock_id: self.stock_id,
            threshold_price: self.threshold_price,
            triggered: false,
            triggered_at: None,
            created_at: self.created_at,
            deleted_at: None,
            deleted_by: None,
        }
    }
}
