//! Stock catalogue, subscription and alert operations.

use std::sync::Arc;

use mockable::Clock;
use pagination::PageRequest;

use super::ports::{AlertRepository, CacheKey, ListSlice, StockRepository, SubscriptionRepository};
use super::{
    ActivityType, Alert, AlertId, CachedLookup, Error, Freshness, NewAlert, NewStock,
    NewSubscription, OperationResult, Price, Principal, Stock, StockChanges, StockId,
    StockListFilter, Subscription, SubscriptionId, Symbol, report_activity,
};

const STOCK: &str = "stock";
const SUBSCRIPTION: &str = "subscription";
const ALERT: &str = "alert";

/// Input for [`StockService::create_stock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDraft {
    /// Ticker symbol.
    pub symbol: Symbol,
    /// Company name.
    pub name: String,
    /// Listing exchange.
    pub exchange: String,
}

/// Input for [`StockService::create_subscription`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDraft {
    /// Symbol of the stock to follow.
    pub symbol: Symbol,
    /// Update interval in seconds.
    pub frequency: u32,
}

/// Input for [`StockService::create_alert`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertDraft {
    /// Symbol of the stock to watch.
    pub symbol: Symbol,
    /// Trigger price.
    pub threshold_price: Price,
}

/// Stock operations backed by the repositories and the shared cache.
#[derive(Clone)]
pub struct StockService {
    stocks: Arc<dyn StockRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    alerts: Arc<dyn AlertRepository>,
    cache: CachedLookup,
    clock: Arc<dyn Clock>,
}

impl StockService {
    /// Create a service over the given adapters.
    pub fn new(
        stocks: Arc<dyn StockRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        alerts: Arc<dyn AlertRepository>,
        cache: CachedLookup,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stocks,
            subscriptions,
            alerts,
            cache,
            clock,
        }
    }

    /// Cache key for a stock looked up by id.
    pub fn id_key(id: StockId) -> CacheKey {
        CacheKey::from_parts("stock_id", [id])
    }

    /// Cache key for a stock looked up by symbol.
    pub fn symbol_key(symbol: &Symbol) -> CacheKey {
        CacheKey::from_parts("stock_symbol", [symbol])
    }

    /// Return the live stock for the draft's symbol, creating or reviving it
    /// when needed.
    pub async fn create_stock(
        &self,
        actor: &Principal,
        draft: StockDraft,
    ) -> OperationResult<Stock> {
        let now = self.clock.utc();
        if let Some(mut existing) = self.stocks.find_by_symbol(&draft.symbol).await? {
            if !existing.is_deleted() {
                return Ok(existing);
            }
            existing.name = draft.name;
            existing.exchange = draft.exchange;
            existing.deleted_at = None;
            existing.deleted_by = None;
            existing.updated_by = Some(actor.user_id);
            existing.updated_at = now;
            self.stocks.update(&existing).await?;
            self.clear_stock_cache(&existing).await;
            report_activity(Some(actor.user_id), ActivityType::Update, STOCK, existing.id);
            return Ok(existing);
        }
        let stock = self
            .stocks
            .insert(NewStock {
                symbol: draft.symbol,
                name: draft.name,
                exchange: draft.exchange,
                created_by: Some(actor.user_id),
                created_at: now,
            })
            .await?;
        self.clear_stock_cache(&stock).await;
        report_activity(Some(actor.user_id), ActivityType::Create, STOCK, stock.id);
        Ok(stock)
    }

    /// Apply name or exchange changes to a live stock.
    pub async fn update_stock(
        &self,
        actor: &Principal,
        id: StockId,
        changes: StockChanges,
    ) -> OperationResult<Stock> {
        let mut stock = self.load_stock(id).await?;
        if let Some(name) = changes.name {
            stock.name = name;
        }
        if let Some(exchange) = changes.exchange {
            stock.exchange = exchange;
        }
        stock.updated_by = Some(actor.user_id);
        stock.updated_at = self.clock.utc();
        self.stocks.update(&stock).await?;
        self.clear_stock_cache(&stock).await;
        report_activity(Some(actor.user_id), ActivityType::Update, STOCK, id);
        Ok(stock)
    }

    /// Soft delete a live stock.
    pub async fn delete_stock(&self, actor: &Principal, id: StockId) -> OperationResult<()> {
        let mut stock = self.load_stock(id).await?;
        stock.deleted_at = Some(self.clock.utc());
        stock.deleted_by = Some(actor.user_id);
        self.stocks.update(&stock).await?;
        self.clear_stock_cache(&stock).await;
        report_activity(Some(actor.user_id), ActivityType::Delete, STOCK, id);
        Ok(())
    }

    /// Fetch a live stock by symbol through the cache.
    pub async fn find_stock_by_symbol(
        &self,
        symbol: &Symbol,
        freshness: Freshness,
    ) -> OperationResult<Stock> {
        self.cache
            .get_or_compute(&Self::symbol_key(symbol), freshness, || async move {
                self.stocks
                    .find_by_symbol(symbol)
                    .await?
                    .filter(|stock| !stock.is_deleted())
                    .ok_or_else(stock_not_found)
            })
            .await
    }

    /// Fetch a live stock by id through the cache.
    pub async fn fetch_stock_by_id(
        &self,
        id: StockId,
        freshness: Freshness,
    ) -> OperationResult<Stock> {
        self.cache
            .get_or_compute(&Self::id_key(id), freshness, || self.load_stock(id))
            .await
    }

    /// List live stocks matching `keyword`.
    pub async fn fetch_stock_list(
        &self,
        keyword: Option<String>,
        page: PageRequest,
    ) -> OperationResult<ListSlice<Stock>> {
        let filter = StockListFilter {
            keyword: keyword.filter(|value| !value.trim().is_empty()),
        };
        Ok(self.stocks.list(&filter, page).await?)
    }

    /// Subscribe the caller to a stock.
    pub async fn create_subscription(
        &self,
        actor: &Principal,
        draft: SubscriptionDraft,
    ) -> OperationResult<Subscription> {
        if draft.frequency == 0 {
            return Err(Error::field("frequency", "Frequency must be at least one second"));
        }
        let stock = self
            .find_stock_by_symbol(&draft.symbol, Freshness::AllowCached)
            .await?;
        let duplicate = self
            .subscriptions
            .find_for(actor.user_id, stock.id)
            .await?
            .is_some_and(|existing| existing.deleted_at.is_none());
        if duplicate {
            return Err(Error::invalid_request("Subscription already exists"));
        }
        let subscription = self
            .subscriptions
            .insert(NewSubscription {
                user_id: actor.user_id,
                stock_id: stock.id,
                frequency: draft.frequency,
                created_at: self.clock.utc(),
            })
            .await?;
        report_activity(
            Some(actor.user_id),
            ActivityType::Create,
            SUBSCRIPTION,
            subscription.id,
        );
        Ok(subscription)
    }

    /// Soft delete a subscription owned by the caller.
    pub async fn delete_subscription(
        &self,
        actor: &Principal,
        id: SubscriptionId,
    ) -> OperationResult<()> {
        let mut subscription = self
            .subscriptions
            .find_by_id(id)
            .await?
            .filter(|found| found.deleted_at.is_none())
            .ok_or_else(|| Error::not_found("Subscription not found"))?;
        if !actor.may_act_for(subscription.user_id) {
            return Err(Error::permission_denied());
        }
        subscription.active = false;
        subscription.deleted_at = Some(self.clock.utc());
        subscription.deleted_by = Some(actor.user_id);
        self.subscriptions.update(&subscription).await?;
        report_activity(Some(actor.user_id), ActivityType::Delete, SUBSCRIPTION, id);
        Ok(())
    }

    /// Register a price alert for the caller.
    pub async fn create_alert(
        &self,
        actor: &Principal,
        draft: AlertDraft,
    ) -> OperationResult<Alert> {
        let stock = self
            .find_stock_by_symbol(&draft.symbol, Freshness::AllowCached)
            .await?;
        let alert = self
            .alerts
            .insert(NewAlert {
                user_id: actor.user_id,
                stock_id: stock.id,
                threshold_price: draft.threshold_price,
                created_at: self.clock.utc(),
            })
            .await?;
        report_activity(Some(actor.user_id), ActivityType::Create, ALERT, alert.id);
        Ok(alert)
    }

    /// Soft delete an alert owned by the caller.
    pub async fn delete_alert(&self, actor: &Principal, id: AlertId) -> OperationResult<()> {
        let mut alert = self
            .alerts
            .find_by_id(id)
            .await?
            .filter(|found| found.deleted_at.is_none())
            .ok_or_else(|| Error::not_found("Alert not found"))?;
        if !actor.may_act_for(alert.user_id) {
            return Err(Error::permission_denied());
        }
        alert.deleted_at = Some(self.clock.utc());
        alert.deleted_by = Some(actor.user_id);
        self.alerts.update(&alert).await?;
        report_activity(Some(actor.user_id), ActivityType::Delete, ALERT, id);
        Ok(())
    }

    async fn load_stock(&self, id: StockId) -> OperationResult<Stock> {
        self.stocks
            .find_by_id(id)
            .await?
            .filter(|stock| !stock.is_deleted())
            .ok_or_else(stock_not_found)
    }

    async fn clear_stock_cache(&self, stock: &Stock) {
        self.cache
            .invalidate_all([Self::id_key(stock.id), Self::symbol_key(&stock.symbol)])
            .await;
    }
}

fn stock_not_found() -> Error {
    Error::not_found("Stock not found")
}

#[cfg(test)]
#[path = "stock_service_tests.rs"]
mod tests;
