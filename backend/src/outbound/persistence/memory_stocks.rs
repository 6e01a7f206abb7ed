//! In-memory stock, subscription and alert repositories.

use async_trait::async_trait;
use pagination::PageRequest;

use crate::domain::ports::{
    AlertRepository, ListSlice, PersistenceError, StockRepository, SubscriptionRepository,
};
use crate::domain::{
    Alert, AlertId, NewAlert, NewStock, NewSubscription, Stock, StockId, StockListFilter,
    Subscription, SubscriptionId, Symbol, UserId,
};

use super::table::Table;

/// Stock rows keyed by id; symbols are unique across all rows.
#[derive(Debug)]
pub struct MemoryStockRepository {
    table: Table<Stock>,
}

impl Default for MemoryStockRepository {
    fn default() -> Self {
        Self {
            table: Table::new("stock"),
        }
    }
}

#[async_trait]
impl StockRepository for MemoryStockRepository {
    async fn insert(&self, stock: NewStock) -> Result<Stock, PersistenceError> {
        let symbol = stock.symbol.clone();
        self.table
            .insert_unique(
                |existing| existing.symbol == symbol,
                |id| stock.into_stock(StockId::new(id)),
            )
            .await
    }

    async fn update(&self, stock: &Stock) -> Result<(), PersistenceError> {
        self.table.replace(stock.id.get(), stock.clone()).await
    }

    async fn find_by_id(&self, id: StockId) -> Result<Option<Stock>, PersistenceError> {
        Ok(self.table.get(id.get()).await)
    }

    async fn find_by_symbol(&self, symbol: &Symbol) -> Result<Option<Stock>, PersistenceError> {
        Ok(self.table.find(|stock| &stock.symbol == symbol).await)
    }

    async fn list(
        &self,
        filter: &StockListFilter,
        page: PageRequest,
    ) -> Result<ListSlice<Stock>, PersistenceError> {
        Ok(self
            .table
            .page(
                |stock| filter.matches(stock),
                |stock| stock.symbol.to_string(),
                page,
            )
            .await)
    }
}

/// Subscription rows keyed by id.
#[derive(Debug)]
pub struct MemorySubscriptionRepository {
    table: Table<Subscription>,
}

impl Default for MemorySubscriptionRepository {
    fn default() -> Self {
        Self {
            table: Table::new("subscription"),
        }
    }
}

#[async_trait]
impl SubscriptionRepository for MemorySubscriptionRepository {
    async fn insert(
        &self,
        subscription: NewSubscription,
    ) -> Result<Subscription, PersistenceError> {
        let (user_id, stock_id) = (subscription.user_id, subscription.stock_id);
        self.table
            .insert_unique(
                |existing| {
                    existing.deleted_at.is_none()
                        && existing.user_id == user_id
                        && existing.stock_id == stock_id
                },
                |id| subscription.into_subscription(SubscriptionId::new(id)),
            )
            .await
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), PersistenceError> {
        self.table
            .replace(subscription.id.get(), subscription.clone())
            .await
    }

    async fn find_by_id(
        &self,
        id: SubscriptionId,
    ) -> Result<Option<Subscription>, PersistenceError> {
        Ok(self.table.get(id.get()).await)
    }

    async fn find_for(
        &self,
        user: UserId,
        stock: StockId,
    ) -> Result<Option<Subscription>, PersistenceError> {
        Ok(self
            .table
            .find(|row| row.deleted_at.is_none() && row.user_id == user && row.stock_id == stock)
            .await)
    }
}

/// Alert rows keyed by id.
#[derive(Debug)]
pub struct MemoryAlertRepository {
    table: Table<Alert>,
}

impl Default for MemoryAlertRepository {
    fn default() -> Self {
        Self {
            table: Table::new("alert"),
        }
    }
}

#[async_trait]
impl AlertRepository for MemoryAlertRepository {
    async fn insert(&self, alert: NewAlert) -> Result<Alert, PersistenceError> {
        self.table
            .insert(|id| alert.into_alert(AlertId::new(id)))
            .await
    }

    async fn update(&self, alert: &Alert) -> Result<(), PersistenceError> {
        self.table.replace(alert.id.get(), alert.clone()).await
    }

    async fn find_by_id(&self, id: AlertId) -> Result<Option<Alert>, PersistenceError> {
        Ok(self.table.get(id.get()).await)
    }
}
