//! Order operations.
//!
//! Fetches go through the request cache and land in the orders slice of the
//! store. Each operation reports progress in its own [`OpState`] slot.
//!
//! [`OpState`]: crate::store::OpState

use std::sync::Arc;

use marketplace_core::models::{CreateOrder, Order};
use marketplace_core::{OrderId, OrderStatus, UserId};
use serde::Serialize;
use tracing::{debug, error, instrument};

use crate::api::ApiClient;
use crate::cache::{CacheValue, QueryCache, QueryFamily, QueryKey};
use crate::error::{ClientError, Result};
use crate::notify::{Notifier, Toast};
use crate::sequence::{Scope, Sequencer};
use crate::store::{OrderOp, OrdersAction, OrdersState, Store};

const LIST_KEYS: &[&str] = &["data", "orders"];
const ORDER_KEYS: &[&str] = &["data", "order"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusBody<'a> {
    new_status: &'a OrderStatus,
}

/// Order hooks over the API, cache and store.
#[derive(Clone)]
pub struct OrderService {
    inner: Arc<OrderServiceInner>,
}

struct OrderServiceInner {
    api: ApiClient,
    store: Store,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
    sequencer: Sequencer,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService").finish_non_exhaustive()
    }
}

impl OrderService {
    #[must_use]
    pub fn new(
        api: ApiClient,
        store: Store,
        cache: QueryCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(OrderServiceInner {
                api,
                store,
                cache,
                notifier,
                sequencer: Sequencer::new(),
            }),
        }
    }

    /// Current orders slice.
    #[must_use]
    pub fn snapshot(&self) -> OrdersState {
        self.inner.store.select(|state| state.orders.clone())
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Orders of one user.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn fetch_mine(&self, user: &UserId) -> Result<Vec<Order>> {
        self.fetch_list(
            OrderOp::FetchMine,
            QueryKey::MyOrders(user.clone()),
            &format!("/orders/{user}"),
            OrdersAction::MineLoaded,
        )
        .await
    }

    /// Every live order (admin).
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> Result<Vec<Order>> {
        self.fetch_list(
            OrderOp::FetchAll,
            QueryKey::AllOrders,
            "/orders",
            OrdersAction::AllLoaded,
        )
        .await
    }

    /// Soft-deleted orders (admin).
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn fetch_deleted(&self) -> Result<Vec<Order>> {
        self.fetch_list(
            OrderOp::FetchDeleted,
            QueryKey::DeletedOrders,
            "/orders/deleted",
            OrdersAction::DeletedLoaded,
        )
        .await
    }

    /// Orders containing the logged-in seller's products.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn seller_orders(&self) -> Result<Vec<Order>> {
        self.fetch_list(
            OrderOp::FetchSeller,
            QueryKey::SellerOrders,
            "/orders/seller",
            OrdersAction::SellerLoaded,
        )
        .await
    }

    /// One order with populated lines.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &OrderId) -> Result<Order> {
        let key = QueryKey::Order(id.clone());
        let store = &self.inner.store;

        if let Some(CacheValue::Order(order)) = self.inner.cache.get(&key).await {
            store.orders(OrdersAction::DetailLoaded(order.clone()));
            return Ok(*order);
        }

        store.orders(OrdersAction::Started(OrderOp::FetchOne));
        let generation = self.inner.cache.generation(&key);
        let result = async {
            let envelope = self.inner.api.get(&format!("/orders/details/{id}")).await?;
            envelope.field::<Order>(ORDER_KEYS)
        }
        .await;

        match result {
            Ok(order) => {
                self.inner
                    .cache
                    .insert_fetched(key, CacheValue::Order(Box::new(order.clone())), generation)
                    .await;
                store.orders(OrdersAction::DetailLoaded(Box::new(order.clone())));
                Ok(order)
            }
            Err(e) => {
                error!(order = %id, error = %e, "Failed to fetch order");
                store.orders(OrdersAction::Failed(OrderOp::FetchOne, e.user_message()));
                Err(e)
            }
        }
    }

    async fn fetch_list(
        &self,
        op: OrderOp,
        key: QueryKey,
        path: &str,
        loaded: fn(Vec<Order>) -> OrdersAction,
    ) -> Result<Vec<Order>> {
        let store = &self.inner.store;

        if let Some(CacheValue::Orders(orders)) = self.inner.cache.get(&key).await {
            store.orders(loaded(orders.clone()));
            return Ok(orders);
        }

        let ticket = self.inner.sequencer.issue(Scope::Named(key.to_string()));
        let generation = self.inner.cache.generation(&key);
        store.orders(OrdersAction::Started(op));

        let result = async {
            let envelope = self.inner.api.get(path).await?;
            envelope.field::<Vec<Order>>(LIST_KEYS)
        }
        .await;

        // A newer fetch was issued, or a mutation settled while this one ran
        if !self.inner.sequencer.is_current(&ticket)
            || self.inner.cache.generation(&key) != generation
        {
            debug!(key = %key, "Discarding stale orders response");
            return result;
        }

        match result {
            Ok(orders) => {
                self.inner
                    .cache
                    .insert_fetched(key, CacheValue::Orders(orders.clone()), generation)
                    .await;
                store.orders(loaded(orders.clone()));
                Ok(orders)
            }
            Err(e) => {
                error!(key = %key, error = %e, "Failed to fetch orders");
                store.orders(OrdersAction::Failed(op, e.user_message()));
                Err(e)
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Turn the server-side cart into an order.
    ///
    /// Blank coupon codes are dropped; the request always carries a
    /// `coupons` array.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self, coupons))]
    pub async fn create<I, S>(&self, coupons: I, user: Option<&UserId>) -> Result<Order>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let body = CreateOrder::with_coupons(coupons);
        let store = &self.inner.store;
        store.orders(OrdersAction::Started(OrderOp::Create));

        let result = async {
            let envelope = self.inner.api.post("/orders", &body).await?;
            let order = envelope.field::<Order>(ORDER_KEYS)?;
            Ok::<_, ClientError>((order, envelope.message().map(str::to_owned)))
        }
        .await;

        match result {
            Ok((order, message)) => {
                store.orders(OrdersAction::Created(Box::new(order.clone())));
                self.inner.cache.invalidate_family(QueryFamily::Orders);
                self.inner.cache.invalidate_family(QueryFamily::Stats);
                if let Some(user) = user {
                    self.inner.cache.invalidate(&QueryKey::Cart(user.clone())).await;
                }
                self.inner.notifier.notify(Toast::success(
                    message.unwrap_or_else(|| "Order placed".to_string()),
                ));
                Ok(order)
            }
            Err(e) => {
                error!(error = %e, "Failed to create order");
                store.orders(OrdersAction::Failed(OrderOp::Create, e.user_message()));
                self.inner.notifier.notify(Toast::error("Cannot create order"));
                Err(e)
            }
        }
    }

    /// Soft-delete an order (admin).
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &OrderId) -> Result<()> {
        self.inner.store.orders(OrdersAction::Started(OrderOp::Delete));
        let result = self.inner.api.delete(&format!("/orders/{id}")).await;
        self.settle(
            OrderOp::Delete,
            result.map(|_| OrdersAction::Deleted(id.clone())),
            "Order deleted",
            "Cannot delete order",
        )
    }

    /// Bring back a soft-deleted order (admin).
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self))]
    pub async fn restore(&self, id: &OrderId) -> Result<()> {
        self.inner.store.orders(OrdersAction::Started(OrderOp::Restore));
        let result = self
            .inner
            .api
            .patch(&format!("/orders/{id}/restore"), &serde_json::json!({}))
            .await;
        self.settle(
            OrderOp::Restore,
            result.map(|_| OrdersAction::Restored(id.clone())),
            "Order restored",
            "Cannot restore order",
        )
    }

    /// Move an order to another status.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: &OrderId, status: OrderStatus) -> Result<()> {
        self.inner
            .store
            .orders(OrdersAction::Started(OrderOp::UpdateStatus));
        let body = StatusBody {
            new_status: &status,
        };
        let result = self
            .inner
            .api
            .patch(&format!("/orders/{id}/status"), &body)
            .await;
        self.settle(
            OrderOp::UpdateStatus,
            result.map(|_| OrdersAction::StatusUpdated {
                id: id.clone(),
                status: status.clone(),
            }),
            "Order status updated",
            "Cannot update order status",
        )
    }

    fn settle(
        &self,
        op: OrderOp,
        result: Result<OrdersAction>,
        success: &str,
        failure: &str,
    ) -> Result<()> {
        match result {
            Ok(action) => {
                self.inner.store.orders(action);
                self.inner.cache.invalidate_family(QueryFamily::Orders);
                self.inner.notifier.notify(Toast::success(success));
                Ok(())
            }
            Err(e) => {
                error!(op = ?op, error = %e, "Order mutation failed");
                self.inner
                    .store
                    .orders(OrdersAction::Failed(op, e.user_message()));
                self.inner.notifier.notify(Toast::error(failure));
                Err(e)
            }
        }
    }
}
