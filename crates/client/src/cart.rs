//! Cart synchronization.
//!
//! The server owns the cart; the store holds a local copy. [`CartSync`]
//! sends each change to the server and applies the confirmed result locally.
//! In optimistic mode the change is applied first and rolled back if the
//! server rejects it.
//!
//! Every request takes a sequence ticket (per product line, or cart-wide for
//! load and clear). A response that arrives after a newer request for the
//! same resource was issued is discarded, so the latest-issued request wins.
//! Once no mutation is in flight, the cart is re-fetched silently if any
//! settled mutation succeeded or had its response discarded.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use marketplace_core::models::{Cart, CartItem};
use marketplace_core::{ProductId, UserId};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::api::{ApiClient, Envelope};
use crate::cache::{CacheValue, QueryCache, QueryKey};
use crate::config::CartMode;
use crate::error::{ClientError, Result};
use crate::notify::{Notifier, Toast};
use crate::sequence::{Scope, Sequencer, Ticket};
use crate::session::SessionHandle;
use crate::store::{CartAction, CartOp, CartState, Store};

const CART_PATH: &str = "/cart";
const CLEAR_PATH: &str = "/cart/clear";

/// Keys a full cart may be wrapped under.
const CART_KEYS: &[&str] = &["data", "cart"];
/// Keys a single confirmed line may be wrapped under.
const ITEM_KEYS: &[&str] = &["item", "data"];

/// Toast texts for one operation kind.
struct Messages {
    success: &'static str,
    failure: &'static str,
}

const fn messages(op: CartOp) -> Messages {
    match op {
        CartOp::Load => Messages {
            success: "Cart loaded",
            failure: "Cannot load cart",
        },
        CartOp::Add => Messages {
            success: "Item added to cart",
            failure: "Cannot add item",
        },
        CartOp::Update => Messages {
            success: "Quantity updated",
            failure: "Cannot update quantity",
        },
        CartOp::Remove => Messages {
            success: "Item removed",
            failure: "Cannot remove item",
        },
        CartOp::Clear => Messages {
            success: "Cart cleared",
            failure: "Cannot clear cart",
        },
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LineBody<'a> {
    product_id: &'a ProductId,
    quantity: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveBody<'a> {
    product_id: &'a ProductId,
}

// =============================================================================
// CartSync
// =============================================================================

/// Keeps the local cart in step with the server.
#[derive(Clone)]
pub struct CartSync {
    inner: Arc<CartSyncInner>,
}

struct CartSyncInner {
    api: ApiClient,
    store: Store,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
    session: SessionHandle,
    sequencer: Sequencer,
    mode: CartMode,
    /// Mutations between issue and settle.
    in_flight: AtomicUsize,
    /// The server cart changed since the last settled re-fetch.
    needs_refresh: AtomicBool,
}

/// Counts one mutation as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for CartSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSync")
            .field("mode", &self.inner.mode)
            .finish_non_exhaustive()
    }
}

impl CartSync {
    #[must_use]
    pub fn new(
        api: ApiClient,
        store: Store,
        cache: QueryCache,
        notifier: Arc<dyn Notifier>,
        session: SessionHandle,
        mode: CartMode,
    ) -> Self {
        Self {
            inner: Arc::new(CartSyncInner {
                api,
                store,
                cache,
                notifier,
                session,
                sequencer: Sequencer::new(),
                mode,
                in_flight: AtomicUsize::new(0),
                needs_refresh: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn mode(&self) -> CartMode {
        self.inner.mode
    }

    /// Current cart slice.
    #[must_use]
    pub fn snapshot(&self) -> CartState {
        self.inner.store.select(|state| state.cart.clone())
    }

    /// Whether a request of this kind is in flight.
    #[must_use]
    pub fn is_pending(&self, op: CartOp) -> bool {
        self.inner.store.select(|state| state.cart.is_pending(op))
    }

    // =========================================================================
    // Fetching
    // =========================================================================

    /// Fetch the cart for `user` and replace the local copy.
    ///
    /// Without a user no request is sent. On failure the local cart is kept,
    /// the slice moves to the error state and one error toast is emitted.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn load(&self, user: Option<&UserId>) -> Result<Option<Cart>> {
        self.fetch(user, true).await
    }

    /// Re-fetch the logged-in user's cart without emitting toasts.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Option<Cart>> {
        let user = self.current_user();
        self.fetch(user.as_ref(), false).await
    }

    async fn fetch(&self, user: Option<&UserId>, notify: bool) -> Result<Option<Cart>> {
        let Some(user) = user else {
            debug!("No user, skipping cart fetch");
            return Ok(None);
        };

        let ticket = self.inner.sequencer.issue(Scope::Cart);
        let key = QueryKey::Cart(user.clone());
        let generation = self.inner.cache.generation(&key);
        self.inner.store.cart(CartAction::Started(CartOp::Load));

        let result = async {
            let envelope = self.inner.api.get_fresh(CART_PATH).await?;
            let cart: Cart = envelope.field(CART_KEYS)?;
            Ok::<_, ClientError>(reconcile_total(cart))
        }
        .await;

        let outcome = match result {
            Ok(cart) => {
                if self.inner.sequencer.is_current(&ticket) {
                    self.inner.store.cart(CartAction::Loaded(cart.clone()));
                    self.inner
                        .cache
                        .insert_fetched(key, CacheValue::Cart(cart.clone()), generation)
                        .await;
                } else {
                    debug!(ticket = ticket.number(), "Discarding stale cart fetch");
                }
                Ok(Some(cart))
            }
            Err(e) => {
                error!(error = %e, "Failed to load cart");
                if self.inner.sequencer.is_current(&ticket) {
                    self.inner
                        .store
                        .cart(CartAction::LoadFailed(messages(CartOp::Load).failure.to_string()));
                }
                if notify {
                    self.inner
                        .notifier
                        .notify(Toast::error(messages(CartOp::Load).failure));
                }
                Err(e)
            }
        };

        self.inner.store.cart(CartAction::Settled(CartOp::Load));
        outcome
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn add_item(&self, product: &ProductId, quantity: u32) -> Result<()> {
        let existing = self.inner.store.select(|state| {
            state.cart.cart.find(product).map(|item| item.quantity)
        });
        // A new line cannot be shown before the server returns its product
        let optimistic = existing.map(|current| CartAction::SetQuantity {
            product: product.clone(),
            quantity: current.saturating_add(quantity),
        });

        let body = LineBody {
            product_id: product,
            quantity,
        };
        self.mutate(
            CartOp::Add,
            Scope::CartLine(product.clone()),
            optimistic.clone(),
            self.inner.api.post(CART_PATH, &body),
            |envelope| {
                if let Some(cart) = full_cart(envelope)? {
                    return Ok(Some(CartAction::Loaded(cart)));
                }
                if let Some(item) = envelope.optional_field::<CartItem>(ITEM_KEYS)? {
                    return Ok(Some(CartAction::Upsert(item)));
                }
                Ok(optimistic)
            },
        )
        .await
    }

    /// Set a line's quantity. A quantity of 0 removes the line.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn update_quantity(&self, product: &ProductId, quantity: u32) -> Result<()> {
        let change = CartAction::SetQuantity {
            product: product.clone(),
            quantity,
        };
        let body = LineBody {
            product_id: product,
            quantity,
        };
        self.mutate(
            CartOp::Update,
            Scope::CartLine(product.clone()),
            Some(change.clone()),
            self.inner.api.put(CART_PATH, &body),
            |envelope| Ok(Some(full_cart(envelope)?.map_or(change, CartAction::Loaded))),
        )
        .await
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product: &ProductId) -> Result<()> {
        let change = CartAction::Remove(product.clone());
        let body = RemoveBody {
            product_id: product,
        };
        self.mutate(
            CartOp::Remove,
            Scope::CartLine(product.clone()),
            Some(change.clone()),
            self.inner.api.delete_with_body(CART_PATH, &body),
            |envelope| Ok(Some(full_cart(envelope)?.map_or(change, CartAction::Loaded))),
        )
        .await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        self.mutate(
            CartOp::Clear,
            Scope::Cart,
            Some(CartAction::Clear),
            self.inner.api.delete(CLEAR_PATH),
            |_| Ok(Some(CartAction::Clear)),
        )
        .await
    }

    /// Run one mutation: optimistic change, request, confirmed change or
    /// rollback, toast, cache invalidation, and the silent re-fetch once the
    /// last concurrent mutation settles.
    async fn mutate<R, F>(
        &self,
        op: CartOp,
        scope: Scope,
        optimistic: Option<CartAction>,
        request: R,
        confirm: F,
    ) -> Result<()>
    where
        R: Future<Output = Result<Envelope>>,
        F: FnOnce(&Envelope) -> Result<Option<CartAction>>,
    {
        let store = &self.inner.store;
        let text = messages(op);
        let guard = InFlight::enter(&self.inner.in_flight);
        let ticket = self.inner.sequencer.issue(scope);
        store.cart(CartAction::Started(op));

        let snapshot = match (self.inner.mode, optimistic) {
            (CartMode::Optimistic, Some(change)) => {
                let before = store.select(|state| state.cart.cart.clone());
                store.cart(change);
                Some(before)
            }
            _ => None,
        };

        let result = match request.await {
            Ok(envelope) => confirm(&envelope).map(|change| (change, envelope)),
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok((change, envelope)) => {
                self.apply_if_current(&ticket, change);
                self.inner.needs_refresh.store(true, Ordering::SeqCst);
                let message = success_message(op, envelope.message());
                self.inner.notifier.notify(Toast::success(message));
                Ok(())
            }
            Err(e) => {
                error!(op = ?op, error = %e, "Cart mutation failed");
                if let Some(before) = snapshot {
                    if self.inner.sequencer.is_current(&ticket) {
                        store.cart(CartAction::Restore(before));
                    } else {
                        debug!(ticket = ticket.number(), "Newer request pending, skipping rollback");
                    }
                }
                self.inner.notifier.notify(Toast::error(text.failure));
                Err(e)
            }
        };

        self.invalidate().await;
        store.cart(CartAction::Settled(op));
        drop(guard);
        self.refresh_when_idle().await;
        outcome
    }

    /// Re-fetch the cart if no mutation is in flight and one changed the
    /// server since the last re-fetch. Errors are logged, never surfaced.
    async fn refresh_when_idle(&self) {
        if self.inner.in_flight.load(Ordering::SeqCst) > 0
            || !self.inner.needs_refresh.swap(false, Ordering::SeqCst)
        {
            return;
        }
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Cart re-fetch after mutation failed");
        }
    }

    fn apply_if_current(&self, ticket: &Ticket, change: Option<CartAction>) {
        if !self.inner.sequencer.is_current(ticket) {
            debug!(
                ticket = ticket.number(),
                scope = ?ticket.scope(),
                "Discarding stale cart response"
            );
            return;
        }
        match change {
            Some(change) => self.inner.store.cart(change),
            None => debug!("Response carried no cart change"),
        }
    }

    async fn invalidate(&self) {
        if let Some(user) = self.current_user() {
            self.inner.cache.invalidate(&QueryKey::Cart(user)).await;
        }
    }

    fn current_user(&self) -> Option<UserId> {
        self.inner.session.user().map(|user| user.id)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Success toast text. Only an add reports the server's own message.
fn success_message(op: CartOp, server: Option<&str>) -> &str {
    match (op, server) {
        (CartOp::Add, Some(message)) => message,
        _ => messages(op).success,
    }
}

/// A full cart in the response, if the server sent one.
fn full_cart(envelope: &Envelope) -> Result<Option<Cart>> {
    let holds_cart = envelope
        .raw(CART_KEYS)
        .is_some_and(|value| value.get("items").is_some_and(Value::is_array));
    if !holds_cart {
        return Ok(None);
    }
    let cart: Cart = envelope.field(CART_KEYS)?;
    Ok(Some(reconcile_total(cart)))
}

/// Recompute a server cart's total, logging when the server disagrees.
fn reconcile_total(cart: Cart) -> Cart {
    if !cart.is_consistent() {
        warn!(
            server_total = %cart.total,
            computed_total = %cart.computed_total(),
            "Server cart total does not match its lines"
        );
    }
    cart.normalized()
}
