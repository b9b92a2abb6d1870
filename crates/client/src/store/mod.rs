//! Global application store.
//!
//! State is split into typed slices, each changed only by its pure reducer.
//! The [`Store`] holds the state in a `tokio::sync::watch` channel: every
//! dispatch applies a reducer atomically and wakes subscribers.

pub mod cart;
pub mod orders;

use std::sync::Arc;

use tokio::sync::watch;

pub use cart::{CartAction, CartOp, CartState, CartStatus};
pub use orders::{OpState, OrderOp, OrdersAction, OrdersState};

/// Whole application state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub cart: CartState,
    pub orders: OrdersState,
}

/// Store actions, routed to the slice they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Cart(CartAction),
    Orders(OrdersAction),
    /// Reset every slice, e.g. on logout.
    Reset,
}

/// Apply an action to the whole state.
#[must_use]
pub fn reduce(state: AppState, action: Action) -> AppState {
    match action {
        Action::Cart(action) => AppState {
            cart: cart::reduce(state.cart, action),
            ..state
        },
        Action::Orders(action) => AppState {
            orders: orders::reduce(state.orders, action),
            ..state
        },
        Action::Reset => AppState::default(),
    }
}

/// Shared handle to the application state.
#[derive(Debug, Clone)]
pub struct Store {
    tx: Arc<watch::Sender<AppState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    #[must_use]
    pub fn with_state(state: AppState) -> Self {
        Self {
            tx: Arc::new(watch::Sender::new(state)),
        }
    }

    /// Apply `action` and notify subscribers.
    pub fn dispatch(&self, action: Action) {
        self.tx.send_modify(|state| {
            let current = std::mem::take(state);
            *state = reduce(current, action);
        });
    }

    /// Dispatch a cart action.
    pub fn cart(&self, action: CartAction) {
        self.dispatch(Action::Cart(action));
    }

    /// Dispatch an orders action.
    pub fn orders(&self, action: OrdersAction) {
        self.dispatch(Action::Orders(action));
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    /// Read part of the state without cloning the rest.
    pub fn select<T>(&self, f: impl FnOnce(&AppState) -> T) -> T {
        f(&self.tx.borrow())
    }

    /// Receiver that is woken on every dispatch.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use marketplace_core::models::Cart;

    use super::*;

    #[tokio::test]
    async fn test_subscribers_see_dispatches() {
        let store = Store::new();
        let mut rx = store.subscribe();

        store.cart(CartAction::Loaded(Cart::default()));

        assert!(rx.has_changed().unwrap_or(false));
        rx.changed().await.ok();
        assert_eq!(rx.borrow().cart.status, CartStatus::Loaded);
    }

    #[test]
    fn test_reset_clears_every_slice() {
        let store = Store::new();
        store.cart(CartAction::Loaded(Cart::default()));
        store.orders(OrdersAction::MineLoaded(vec![]));
        store.dispatch(Action::Reset);
        assert_eq!(store.snapshot(), AppState::default());
    }

    #[test]
    fn test_select() {
        let store = Store::new();
        let status = store.select(|state| state.cart.status.clone());
        assert_eq!(status, CartStatus::Empty);
    }
}
