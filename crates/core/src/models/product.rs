//! Catalog products.

use serde::{Deserialize, Serialize};

use super::category::CategoryRef;
use crate::types::{Price, ProductId, UserId};

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default, alias = "sellerId")]
    pub seller: Option<UserId>,
    #[serde(default)]
    pub primary_image: Option<String>,
    #[serde(default)]
    pub secondary_images: Vec<String>,
}

impl Product {
    /// Whether at least one unit can be ordered.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// Create/update payload for a product.
///
/// Image fields carry already-hosted URLs; uploads are handled elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_image: Option<String>,
}
