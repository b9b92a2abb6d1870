//! Cart slice.

use std::collections::HashMap;

use marketplace_core::ProductId;
use marketplace_core::models::{Cart, CartItem};

/// Lifecycle of the local cart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CartStatus {
    /// Nothing loaded yet, or reset on logout.
    #[default]
    Empty,
    /// In sync with the last server response.
    Loaded,
    /// At least one mutation is in flight.
    Mutating,
    /// The last load failed.
    Error(String),
}

/// Kinds of cart requests, tracked separately for pending flags.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CartOp {
    Load,
    Add,
    Update,
    Remove,
    Clear,
}

impl CartOp {
    #[must_use]
    pub const fn is_mutation(self) -> bool {
        !matches!(self, Self::Load)
    }
}

/// Cart slice of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    pub cart: Cart,
    pub status: CartStatus,
    pending: HashMap<CartOp, u32>,
}

impl CartState {
    /// Whether a request of this kind is in flight.
    #[must_use]
    pub fn is_pending(&self, op: CartOp) -> bool {
        self.pending.get(&op).copied().unwrap_or(0) > 0
    }

    fn mutations_in_flight(&self) -> bool {
        self.pending
            .iter()
            .any(|(op, count)| op.is_mutation() && *count > 0)
    }

    fn settled_status(&self) -> CartStatus {
        if self.mutations_in_flight() {
            CartStatus::Mutating
        } else {
            CartStatus::Loaded
        }
    }
}

/// Cart slice actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// A request of this kind was sent.
    Started(CartOp),
    /// A request of this kind finished, whatever its outcome.
    Settled(CartOp),
    /// A fetched cart replaces the local one.
    Loaded(Cart),
    /// The cart could not be fetched.
    LoadFailed(String),
    /// Insert or replace one line.
    Upsert(CartItem),
    /// Set a line's quantity; 0 removes the line.
    SetQuantity { product: ProductId, quantity: u32 },
    /// Remove a product's line.
    Remove(ProductId),
    /// Drop every line.
    Clear,
    /// Put back a snapshot taken before an optimistic change.
    Restore(Cart),
    /// Back to the initial state.
    Reset,
}

/// Apply an action to the cart slice.
///
/// The cart total is recomputed from the lines on every change.
#[must_use]
pub fn reduce(mut state: CartState, action: CartAction) -> CartState {
    match action {
        CartAction::Started(op) => {
            *state.pending.entry(op).or_insert(0) += 1;
            if op.is_mutation() {
                state.status = CartStatus::Mutating;
            }
        }
        CartAction::Settled(op) => {
            if let Some(count) = state.pending.get_mut(&op) {
                *count = count.saturating_sub(1);
            }
            state.pending.retain(|_, count| *count > 0);
            if state.status == CartStatus::Mutating {
                state.status = state.settled_status();
            }
        }
        CartAction::Loaded(cart) => {
            state.cart = cart.normalized();
            state.status = state.settled_status();
        }
        CartAction::LoadFailed(message) => {
            state.status = CartStatus::Error(message);
        }
        CartAction::Upsert(item) => {
            state.cart.upsert(item);
        }
        CartAction::SetQuantity { product, quantity } => {
            state.cart.set_quantity(&product, quantity);
        }
        CartAction::Remove(product) => {
            state.cart.remove(&product);
        }
        CartAction::Clear => {
            state.cart.clear();
        }
        CartAction::Restore(cart) => {
            state.cart = cart;
        }
        CartAction::Reset => return CartState::default(),
    }
    state
}

#[cfg(test)]
mod tests {
    use marketplace_core::models::CartProduct;
    use marketplace_core::{CartItemId, Price};

    use super::*;

    fn item(product: &str, price: i64, quantity: u32) -> CartItem {
        CartItem {
            id: CartItemId::new(format!("line-{product}")),
            product: CartProduct {
                id: ProductId::new(product),
                title: None,
                price: Price::from(price),
                primary_image: None,
            },
            quantity,
        }
    }

    fn loaded(items: Vec<CartItem>) -> CartState {
        reduce(
            CartState::default(),
            CartAction::Loaded(Cart::from_items(items)),
        )
    }

    #[test]
    fn test_loaded_normalizes_total() {
        let cart = Cart {
            items: vec![item("p1", 20, 2)],
            total: Price::from(1_i64),
        };
        let state = reduce(CartState::default(), CartAction::Loaded(cart));
        assert_eq!(state.cart.total, Price::from(40_i64));
        assert_eq!(state.status, CartStatus::Loaded);
    }

    #[test]
    fn test_set_quantity_recomputes_total() {
        let state = loaded(vec![item("p1", 20, 2)]);
        let state = reduce(
            state,
            CartAction::SetQuantity {
                product: ProductId::new("p1"),
                quantity: 5,
            },
        );
        assert_eq!(state.cart.total, Price::from(100_i64));
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let state = loaded(vec![item("p1", 20, 2), item("p2", 5, 1)]);
        let state = reduce(
            state,
            CartAction::SetQuantity {
                product: ProductId::new("p1"),
                quantity: 0,
            },
        );
        assert_eq!(state.cart.items.len(), 1);
        assert_eq!(state.cart.total, Price::from(5_i64));
    }

    #[test]
    fn test_pending_flags_per_operation() {
        let state = loaded(vec![]);
        let state = reduce(state, CartAction::Started(CartOp::Add));
        let state = reduce(state, CartAction::Started(CartOp::Remove));
        assert!(state.is_pending(CartOp::Add));
        assert!(!state.is_pending(CartOp::Update));
        assert_eq!(state.status, CartStatus::Mutating);

        let state = reduce(state, CartAction::Settled(CartOp::Add));
        assert_eq!(state.status, CartStatus::Mutating);

        let state = reduce(state, CartAction::Settled(CartOp::Remove));
        assert!(!state.is_pending(CartOp::Remove));
        assert_eq!(state.status, CartStatus::Loaded);
    }

    #[test]
    fn test_load_failure_keeps_cart() {
        let state = loaded(vec![item("p1", 20, 2)]);
        let before = state.cart.clone();
        let state = reduce(state, CartAction::LoadFailed("Cannot load cart".into()));
        assert_eq!(state.cart, before);
        assert_eq!(state.status, CartStatus::Error("Cannot load cart".into()));
    }

    #[test]
    fn test_restore_and_reset() {
        let state = loaded(vec![item("p1", 20, 2)]);
        let snapshot = state.cart.clone();
        let state = reduce(state, CartAction::Clear);
        assert!(state.cart.is_empty());

        let state = reduce(state, CartAction::Restore(snapshot.clone()));
        assert_eq!(state.cart, snapshot);

        let state = reduce(state, CartAction::Reset);
        assert_eq!(state, CartState::default());
    }
}
