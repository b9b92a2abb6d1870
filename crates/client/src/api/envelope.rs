//! Response envelopes.
//!
//! The backend wraps payloads under different keys depending on the route
//! (`data`, `item`, `products`, `category`...). An [`Envelope`] keeps the raw
//! JSON body and extracts typed payloads by trying an ordered key list.

use marketplace_core::models::Page;
use reqwest::StatusCode;
use serde::Deserialize as _;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// A successful response: status plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub status: StatusCode,
    pub body: Value,
}

impl Envelope {
    #[must_use]
    pub const fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// Server-provided human message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    /// Raw value stored under the first present, non-null key.
    #[must_use]
    pub fn raw(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|key| self.body.get(*key))
            .find(|value| !value.is_null())
    }

    /// Decode the payload stored under the first present key.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` if none of the keys is present and `Parse` if
    /// the payload has the wrong shape.
    pub fn field<T: DeserializeOwned>(&self, keys: &[&str]) -> Result<T> {
        let value = self
            .raw(keys)
            .ok_or_else(|| ClientError::MissingField(keys.join(" | ")))?;
        Ok(T::deserialize(value)?)
    }

    /// Like [`Envelope::field`], but absence is not an error.
    ///
    /// # Errors
    ///
    /// Returns `Parse` if a payload is present with the wrong shape.
    pub fn optional_field<T: DeserializeOwned>(&self, keys: &[&str]) -> Result<Option<T>> {
        self.raw(keys)
            .map(|value| T::deserialize(value).map_err(ClientError::from))
            .transpose()
    }

    /// Decode a paginated list.
    ///
    /// Items are read from `keys`; page numbers from `currentPage`/`page`
    /// and `totalPages`/`pages`, at the top level or next to the items when
    /// the items live in a nested object.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` if no item list is present.
    pub fn page<T: DeserializeOwned>(&self, keys: &[&str], requested: u32) -> Result<Page<T>> {
        let holder = self
            .raw(keys)
            .ok_or_else(|| ClientError::MissingField(keys.join(" | ")))?;

        // Some routes nest as { data: { items: [...], totalPages } }
        let (items_value, meta) = match holder {
            Value::Object(map) => (
                map.get("items")
                    .ok_or_else(|| ClientError::MissingField("items".to_string()))?,
                holder,
            ),
            _ => (holder, &self.body),
        };

        let items = Vec::<T>::deserialize(items_value)?;
        let page = read_u32(meta, &["currentPage", "page"])
            .or_else(|| read_u32(&self.body, &["currentPage", "page"]))
            .unwrap_or(requested);
        let total_pages = read_u32(meta, &["totalPages", "pages"])
            .or_else(|| read_u32(&self.body, &["totalPages", "pages"]))
            .unwrap_or(1);

        Ok(Page::new(items, page, total_pages))
    }
}

fn read_u32(value: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find_map(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::models::Category;
    use serde_json::json;

    use super::*;

    fn envelope(body: Value) -> Envelope {
        Envelope::new(StatusCode::OK, body)
    }

    #[test]
    fn test_field_tries_keys_in_order() {
        let env = envelope(json!({ "category": { "_id": "1", "name": "Electronics" } }));
        let category: Category = env.field(&["data", "category"]).unwrap();
        assert_eq!(category.name, "Electronics");
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let env = envelope(json!({}));
        let err = env.field::<Category>(&["data", "category"]).unwrap_err();
        assert!(matches!(err, ClientError::MissingField(keys) if keys == "data | category"));
    }

    #[test]
    fn test_null_field_counts_as_missing() {
        let env = envelope(json!({ "data": null }));
        assert!(env.optional_field::<Category>(&["data"]).unwrap().is_none());
    }

    #[test]
    fn test_wrong_shape_is_a_parse_error() {
        let env = envelope(json!({ "data": 42 }));
        let err = env.field::<Category>(&["data"]).unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
    }

    #[test]
    fn test_message() {
        let env = envelope(json!({ "message": "Produit ajouté !" }));
        assert_eq!(env.message(), Some("Produit ajouté !"));
    }

    #[test]
    fn test_page_flat_layout() {
        let env = envelope(json!({
            "categories": [{ "_id": "1", "name": "A" }, { "_id": "2", "name": "B" }],
            "currentPage": 2,
            "totalPages": 5
        }));
        let page: Page<Category> = env.page(&["data", "categories"], 1).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page, 2);
        assert_eq!(page.total_pages, 5);
    }

    #[test]
    fn test_page_nested_layout() {
        let env = envelope(json!({
            "data": { "items": [{ "_id": "1", "name": "A" }], "page": 1, "totalPages": 1 }
        }));
        let page: Page<Category> = env.page(&["data"], 1).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(!page.has_next());
    }

    #[test]
    fn test_page_without_metadata_uses_requested_page() {
        let env = envelope(json!({ "data": [] }));
        let page: Page<Category> = env.page(&["data"], 3).unwrap();
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
    }
}
