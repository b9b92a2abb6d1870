//! Seller dashboard statistics.

use serde::{Deserialize, Serialize};

use crate::types::Price;

/// Aggregates shown on the seller dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerStats {
    #[serde(default)]
    pub total_products: u32,
    #[serde(default)]
    pub total_orders: u32,
    #[serde(default)]
    pub total_revenue: Price,
    #[serde(default)]
    pub pending_orders: u32,
}
