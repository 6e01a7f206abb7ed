//! Port abstractions for stock, subscription and alert persistence.
use async_trait::async_trait;
use pagination::PageRequest;

use crate::domain::{
    Alert, AlertId, NewAlert, NewStock, NewSubscription, Stock, StockId, StockListFilter,
    Subscription, SubscriptionId, Symbol, UserId,
};

use super::{ListSlice, PersistenceError};

/// Storage of tracked stocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// Insert a stock and return the stored record.
    async fn insert(&self, stock: NewStock) -> Result<Stock, PersistenceError>;

    /// Replace the stored record with `stock`.
    async fn update(&self, stock: &Stock) -> Result<(), PersistenceError>;

    /// Fetch a live stock by identifier.
    async fn find_by_id(&self, id: StockId) -> Result<Option<Stock>, PersistenceError>;

    /// Fetch a live stock by symbol.
    async fn find_by_symbol(&self, symbol: &Symbol) -> Result<Option<Stock>, PersistenceError>;

    /// Page through live stocks matching `filter`, newest first.
    async fn list(
        &self,
        filter: &StockListFilter,
        page: PageRequest,
    ) -> Result<ListSlice<Stock>, PersistenceError>;
}

/// Storage of price subscriptions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Insert a subscription and return the stored record.
    async fn insert(&self, subscription: NewSubscription) -> Result<Subscription, PersistenceError>;

    /// Replace the stored record with `subscription`.
    async fn update(&self, subscription: &Subscription) -> Result<(), PersistenceError>;

    /// Fetch a live subscription by identifier.
    async fn find_by_id(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, PersistenceError>;

    /// Fetch the live subscription of `user` to `stock`, if any.
    async fn find_for(
        &self,
        user: UserId,
        stock: StockId,
    ) -> Result<Option<Subscription>, PersistenceError>;
}

/// Storage of price alerts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Insert an alert and return the stored record.
    async fn insert(&self, alert: NewAlert) -> Result<Alert, PersistenceError>;

    /// Replace the stored record with `alert`.
    async fn update(&self, alert: &Alert) -> Result<(), PersistenceError>;

    /// Fetch a live alert by identifier.
    async fn find_by_id(&self, id: AlertId) -> Result<Option<Alert>, PersistenceError>;
}
