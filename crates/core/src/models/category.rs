//! Product categories.

use serde::{Deserialize, Serialize};

use crate::types::CategoryId;

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Create/update payload for a category.
///
/// Unset fields are omitted so the same type serves partial updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Category reference embedded in products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Populated(Category),
    Id(CategoryId),
}

impl CategoryRef {
    /// Identifier of the referenced category.
    #[must_use]
    pub const fn id(&self) -> &CategoryId {
        match self {
            Self::Populated(category) => &category.id,
            Self::Id(id) => id,
        }
    }
}
