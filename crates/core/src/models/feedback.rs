//! Customer feedback submitted on products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserRef;
use crate::types::{FeedbackId, FeedbackStatus, ProductId};

/// A feedback entry awaiting or past moderation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(rename = "_id")]
    pub id: FeedbackId,
    #[serde(rename = "userId", default)]
    pub author: Option<UserRef>,
    #[serde(rename = "productId", default)]
    pub product: Option<ProductId>,
    #[serde(alias = "comment")]
    pub message: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub status: FeedbackStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Moderation update for a feedback entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedbackUpdate {
    pub status: FeedbackStatus,
}
