//! Orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserRef;
use crate::types::{OrderId, OrderLineId, OrderStatus, Price, ProductId};

/// Product fields populated on an order line.
///
/// Missing when the product was deleted after purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProduct {
    #[serde(rename = "_id")]
    pub id: ProductId,
    #[serde(default)]
    pub title: Option<String>,
}

/// One purchased product, priced at purchase time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(rename = "_id", default)]
    pub id: Option<OrderLineId>,
    #[serde(rename = "productId", default)]
    pub product: Option<OrderProduct>,
    pub quantity: u32,
    pub price: Price,
}

impl OrderLine {
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }

    /// Product title, or a placeholder when the product no longer exists.
    #[must_use]
    pub fn title(&self) -> &str {
        self.product
            .as_ref()
            .and_then(|p| p.title.as_deref())
            .unwrap_or("Deleted")
    }
}

/// A finalized purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(rename = "userId", default)]
    pub customer: Option<UserRef>,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub total_amount: Option<Price>,
    #[serde(default)]
    pub final_amount: Option<Price>,
    #[serde(default)]
    pub coupons: Vec<String>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Amount charged: the server's final amount, falling back to the total
    /// and then to the sum of the lines.
    #[must_use]
    pub fn amount_due(&self) -> Price {
        self.final_amount
            .or(self.total_amount)
            .unwrap_or_else(|| self.items.iter().map(OrderLine::line_total).sum())
    }
}

/// Request body for creating an order from the server-side cart.
///
/// `coupons` is always serialized, as an empty array when there are none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateOrder {
    pub coupons: Vec<String>,
}

impl CreateOrder {
    /// Build a request from user-entered codes, dropping blank entries.
    #[must_use]
    pub fn with_coupons<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            coupons: codes
                .into_iter()
                .map(|code| code.as_ref().trim().to_owned())
                .filter(|code| !code.is_empty())
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_order_always_sends_coupon_array() {
        let body = serde_json::to_value(CreateOrder::default()).unwrap();
        assert_eq!(body, json!({ "coupons": [] }));

        let body = serde_json::to_value(CreateOrder::with_coupons(["", "  "])).unwrap();
        assert_eq!(body, json!({ "coupons": [] }));

        let body = serde_json::to_value(CreateOrder::with_coupons([" SPRING10 "])).unwrap();
        assert_eq!(body, json!({ "coupons": ["SPRING10"] }));
    }

    #[test]
    fn test_deserialize_admin_order() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o1",
            "userId": { "_id": "u1", "fullname": "Salma", "email": "salma@example.com" },
            "items": [
                { "_id": "l1", "productId": { "_id": "p1", "title": "Argan Oil" }, "quantity": 2, "price": 45 },
                { "_id": "l2", "productId": null, "quantity": 1, "price": 10 }
            ],
            "status": "completed",
            "totalAmount": 100,
            "finalAmount": 90,
            "createdAt": "2025-01-15T10:30:00Z"
        }))
        .unwrap();

        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.amount_due(), Price::from(90_i64));
        assert_eq!(order.items[1].title(), "Deleted");
        assert_eq!(order.customer.unwrap().fullname(), Some("Salma"));
    }

    #[test]
    fn test_amount_due_falls_back_to_lines() {
        let order: Order = serde_json::from_value(json!({
            "_id": "o2",
            "items": [{ "quantity": 3, "price": 12.5 }]
        }))
        .unwrap();
        assert_eq!(order.amount_due(), Price::from_cents(3750));
    }
}
