//! Products and categories.

use std::sync::Arc;

use marketplace_core::models::{Category, CategoryInput, Page, Product, ProductInput};
use marketplace_core::{CategoryId, ProductId, UserId};
use tracing::instrument;

use crate::api::ApiClient;
use crate::cache::{CacheValue, QueryCache, QueryFamily, QueryKey};
use crate::error::{ClientError, Result};
use crate::notify::Notifier;
use crate::service::Backend;

const PRODUCT_LIST_KEYS: &[&str] = &["data", "products"];
const PRODUCT_KEYS: &[&str] = &["data", "product"];
const CATEGORY_LIST_KEYS: &[&str] = &["data", "categories"];
const CATEGORY_KEYS: &[&str] = &["data", "category"];

fn page_query(page: u32) -> [(&'static str, String); 1] {
    [("page", page.max(1).to_string())]
}

// =============================================================================
// Products
// =============================================================================

/// Catalog products.
#[derive(Clone)]
pub struct ProductService {
    backend: Backend,
}

impl std::fmt::Debug for ProductService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductService").finish_non_exhaustive()
    }
}

impl ProductService {
    #[must_use]
    pub fn new(api: ApiClient, cache: QueryCache, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend: Backend::new(api, cache, notifier),
        }
    }

    /// One page of the catalog.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u32) -> Result<Page<Product>> {
        let api = &self.backend.api;
        self.backend
            .cached(
                QueryKey::Products { page },
                |value| match value {
                    CacheValue::Products(page) => Some(page),
                    _ => None,
                },
                CacheValue::Products,
                async {
                    api.get_query("/products", &page_query(page))
                        .await?
                        .page(PRODUCT_LIST_KEYS, page)
                },
            )
            .await
    }

    /// One product.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &ProductId) -> Result<Product> {
        let api = &self.backend.api;
        let product = self
            .backend
            .cached(
                QueryKey::Product(id.clone()),
                |value| match value {
                    CacheValue::Product(product) => Some(product),
                    _ => None,
                },
                CacheValue::Product,
                async {
                    let envelope = api.get(&format!("/products/{id}")).await?;
                    Ok(Box::new(envelope.field::<Product>(PRODUCT_KEYS)?))
                },
            )
            .await?;
        Ok(*product)
    }

    /// Products of one seller.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn by_seller(&self, seller: &UserId) -> Result<Vec<Product>> {
        let api = &self.backend.api;
        self.backend
            .cached(
                QueryKey::SellerProducts(seller.clone()),
                |value| match value {
                    CacheValue::SellerProducts(products) => Some(products),
                    _ => None,
                },
                CacheValue::SellerProducts,
                async {
                    api.get(&format!("/products/seller/{seller}"))
                        .await?
                        .field(PRODUCT_LIST_KEYS)
                },
            )
            .await
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the title or price is missing, otherwise the
    /// request or decoding error.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &ProductInput) -> Result<Product> {
        if input.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(ClientError::Validation("title is required".to_string()));
        }
        if input.price.is_none() {
            return Err(ClientError::Validation("price is required".to_string()));
        }
        let result = async {
            self.backend
                .api
                .post("/products", input)
                .await?
                .field::<Product>(PRODUCT_KEYS)
        }
        .await;
        self.backend.settle(
            result,
            QueryFamily::Products,
            "Product created",
            "Cannot create product",
        )
    }

    /// Update the fields set in `input`.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: &ProductId, input: &ProductInput) -> Result<Product> {
        let result = async {
            self.backend
                .api
                .put(&format!("/products/{id}"), input)
                .await?
                .field::<Product>(PRODUCT_KEYS)
        }
        .await;
        self.backend.settle(
            result,
            QueryFamily::Products,
            "Product updated",
            "Cannot update product",
        )
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &ProductId) -> Result<()> {
        let result = self
            .backend
            .api
            .delete(&format!("/products/{id}"))
            .await
            .map(|_| ());
        self.backend.settle(
            result,
            QueryFamily::Products,
            "Product deleted",
            "Cannot delete product",
        )
    }
}

// =============================================================================
// Categories
// =============================================================================

/// Catalog categories.
#[derive(Clone)]
pub struct CategoryService {
    backend: Backend,
}

impl std::fmt::Debug for CategoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryService").finish_non_exhaustive()
    }
}

impl CategoryService {
    #[must_use]
    pub fn new(api: ApiClient, cache: QueryCache, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend: Backend::new(api, cache, notifier),
        }
    }

    /// One page of categories.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u32) -> Result<Page<Category>> {
        let api = &self.backend.api;
        self.backend
            .cached(
                QueryKey::Categories { page },
                |value| match value {
                    CacheValue::Categories(page) => Some(page),
                    _ => None,
                },
                CacheValue::Categories,
                async {
                    api.get_query("/categories", &page_query(page))
                        .await?
                        .page(CATEGORY_LIST_KEYS, page)
                },
            )
            .await
    }

    /// One category.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &CategoryId) -> Result<Category> {
        let api = &self.backend.api;
        self.backend
            .cached(
                QueryKey::Category(id.clone()),
                |value| match value {
                    CacheValue::Category(category) => Some(category),
                    _ => None,
                },
                CacheValue::Category,
                async {
                    api.get(&format!("/categories/{id}"))
                        .await?
                        .field(CATEGORY_KEYS)
                },
            )
            .await
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the name is blank, otherwise the request or
    /// decoding error.
    #[instrument(skip(self))]
    pub async fn create(&self, input: &CategoryInput) -> Result<Category> {
        if input.name.as_deref().is_none_or(|n| n.trim().is_empty()) {
            return Err(ClientError::Validation("name is required".to_string()));
        }
        let result = async {
            self.backend
                .api
                .post("/categories", input)
                .await?
                .field::<Category>(CATEGORY_KEYS)
        }
        .await;
        self.backend.settle(
            result,
            QueryFamily::Categories,
            "Category created",
            "Cannot create category",
        )
    }

    /// Update the fields set in `input`.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn update(&self, id: &CategoryId, input: &CategoryInput) -> Result<Category> {
        let result = async {
            self.backend
                .api
                .put(&format!("/categories/{id}"), input)
                .await?
                .field::<Category>(CATEGORY_KEYS)
        }
        .await;
        self.backend.settle(
            result,
            QueryFamily::Categories,
            "Category updated",
            "Cannot update category",
        )
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &CategoryId) -> Result<()> {
        let result = self
            .backend
            .api
            .delete(&format!("/categories/{id}"))
            .await
            .map(|_| ());
        self.backend.settle(
            result,
            QueryFamily::Categories,
            "Category deleted",
            "Cannot delete category",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_query_is_one_based() {
        assert_eq!(page_query(0), [("page", "1".to_string())]);
        assert_eq!(page_query(3), [("page", "3".to_string())]);
    }
}
