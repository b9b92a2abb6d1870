//! Shopping cart.
//!
//! A cart is a list of lines plus a total. The total is always derived from
//! the lines: every mutating method recomputes it, and [`Cart::normalized`]
//! repairs a cart received from the backend.

use serde::{Deserialize, Serialize};

use crate::types::{CartItemId, Price, ProductId};

/// Product fields populated on a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub title: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub primary_image: Option<String>,
}

/// One line of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: CartItemId,
    #[serde(rename = "productId")]
    pub product: CartProduct,
    pub quantity: u32,
}

impl CartItem {
    /// Identifier of the product on this line.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// A user's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total: Price,
}

impl Cart {
    /// Build a cart from lines, computing the total.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self {
            items,
            total: Price::ZERO,
        };
        cart.recompute_total();
        cart
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn computed_total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Whether the stored total matches the lines.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total == self.computed_total()
    }

    /// Return the cart with its total recomputed from the lines.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.recompute_total();
        self
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find the line holding a product.
    #[must_use]
    pub fn find(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id() == product_id)
    }

    /// Insert a line, replacing any existing line for the same product.
    pub fn upsert(&mut self, item: CartItem) {
        match self
            .items
            .iter_mut()
            .find(|existing| existing.product_id() == item.product_id())
        {
            Some(existing) => *existing = item,
            None => self.items.push(item),
        }
        self.recompute_total();
    }

    /// Set the quantity of a product's line. A quantity of 0 removes it.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id);
        }
        let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.product_id() == product_id)
        else {
            return false;
        };
        item.quantity = quantity;
        self.recompute_total();
        true
    }

    /// Remove a product's line. Returns `false` if it was not present.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.product_id() != product_id);
        let removed = self.items.len() != before;
        self.recompute_total();
        removed
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total = Price::ZERO;
    }

    fn recompute_total(&mut self) {
        self.total = self.computed_total();
    }
}
