//! Request cache.
//!
//! Read queries are cached in a `moka` future cache keyed by [`QueryKey`].
//! Mutations invalidate single keys or whole [`QueryFamily`]s so the next
//! read goes back to the server.
//!
//! Every invalidation bumps the family's [`Generation`]. A fetch records the
//! generation before it is sent and stores its result only if the family has
//! not been invalidated in the meantime.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use marketplace_core::models::{Cart, Category, Feedback, Order, Page, Product, SellerStats, User};
use marketplace_core::{CategoryId, OrderId, ProductId, UserId};
use moka::future::Cache;
use tracing::{debug, warn};

use crate::config::CacheConfig;

/// Cache key for one read query.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum QueryKey {
    Cart(UserId),
    MyOrders(UserId),
    AllOrders,
    DeletedOrders,
    SellerOrders,
    Order(OrderId),
    Products { page: u32 },
    Product(ProductId),
    SellerProducts(UserId),
    Categories { page: u32 },
    Category(CategoryId),
    Users { page: u32 },
    Feedback { page: u32 },
    SellerStats,
    Profile,
}

/// Group of keys invalidated together.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum QueryFamily {
    Cart,
    Orders,
    Products,
    Categories,
    Users,
    Feedback,
    Stats,
    Profile,
}

impl QueryFamily {
    pub const ALL: [Self; 8] = [
        Self::Cart,
        Self::Orders,
        Self::Products,
        Self::Categories,
        Self::Users,
        Self::Feedback,
        Self::Stats,
        Self::Profile,
    ];
}

impl QueryKey {
    #[must_use]
    pub const fn family(&self) -> QueryFamily {
        match self {
            Self::Cart(_) => QueryFamily::Cart,
            Self::MyOrders(_)
            | Self::AllOrders
            | Self::DeletedOrders
            | Self::SellerOrders
            | Self::Order(_) => QueryFamily::Orders,
            Self::Products { .. } | Self::Product(_) | Self::SellerProducts(_) => {
                QueryFamily::Products
            }
            Self::Categories { .. } | Self::Category(_) => QueryFamily::Categories,
            Self::Users { .. } => QueryFamily::Users,
            Self::Feedback { .. } => QueryFamily::Feedback,
            Self::SellerStats => QueryFamily::Stats,
            Self::Profile => QueryFamily::Profile,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cart(user) => write!(f, "cart:{user}"),
            Self::MyOrders(user) => write!(f, "orders:user:{user}"),
            Self::AllOrders => write!(f, "orders:all"),
            Self::DeletedOrders => write!(f, "orders:deleted"),
            Self::SellerOrders => write!(f, "orders:seller"),
            Self::Order(id) => write!(f, "order:{id}"),
            Self::Products { page } => write!(f, "products:page:{page}"),
            Self::Product(id) => write!(f, "product:{id}"),
            Self::SellerProducts(seller) => write!(f, "products:seller:{seller}"),
            Self::Categories { page } => write!(f, "categories:page:{page}"),
            Self::Category(id) => write!(f, "category:{id}"),
            Self::Users { page } => write!(f, "users:page:{page}"),
            Self::Feedback { page } => write!(f, "feedback:page:{page}"),
            Self::SellerStats => write!(f, "seller:stats"),
            Self::Profile => write!(f, "auth:profile"),
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Cart(Cart),
    Orders(Vec<Order>),
    Order(Box<Order>),
    Products(Page<Product>),
    Product(Box<Product>),
    SellerProducts(Vec<Product>),
    Categories(Page<Category>),
    Category(Category),
    Users(Page<User>),
    Feedback(Page<Feedback>),
    SellerStats(SellerStats),
    Profile(Box<User>),
}

// =============================================================================
// QueryCache
// =============================================================================

/// Invalidation count of one family, taken before a fetch is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    family: QueryFamily,
    value: u64,
}

/// Shared request cache. Cloning shares the underlying storage.
#[derive(Clone)]
pub struct QueryCache {
    cache: Cache<QueryKey, CacheValue>,
    generations: Arc<Mutex<HashMap<QueryFamily, u64>>>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl QueryCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl)
            .support_invalidation_closures()
            .build();
        Self {
            cache,
            generations: Arc::default(),
        }
    }

    /// Current generation of `key`'s family.
    #[must_use]
    pub fn generation(&self, key: &QueryKey) -> Generation {
        let family = key.family();
        let value = self.generations().get(&family).copied().unwrap_or(0);
        Generation { family, value }
    }

    pub async fn get(&self, key: &QueryKey) -> Option<CacheValue> {
        let value = self.cache.get(key).await;
        if value.is_some() {
            debug!(key = %key, "Cache hit");
        }
        value
    }

    pub async fn insert(&self, key: QueryKey, value: CacheValue) {
        self.cache.insert(key, value).await;
    }

    /// Store a fetch result unless `key`'s family was invalidated after
    /// `fetched_at` was taken. Returns whether the value was kept.
    pub async fn insert_fetched(
        &self,
        key: QueryKey,
        value: CacheValue,
        fetched_at: Generation,
    ) -> bool {
        if self.generation(&key) != fetched_at {
            debug!(key = %key, "Skipping cache insert, invalidated during fetch");
            return false;
        }
        self.cache.insert(key.clone(), value).await;
        // An invalidation may have landed between the check and the insert
        if self.generation(&key) != fetched_at {
            debug!(key = %key, "Invalidated during insert, dropping entry");
            self.cache.invalidate(&key).await;
            return false;
        }
        true
    }

    /// Drop one key.
    pub async fn invalidate(&self, key: &QueryKey) {
        debug!(key = %key, "Invalidating cache key");
        self.bump(key.family());
        self.cache.invalidate(key).await;
    }

    /// Drop every key of a family.
    pub fn invalidate_family(&self, family: QueryFamily) {
        debug!(family = ?family, "Invalidating cache family");
        self.bump(family);
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |key, _| key.family() == family)
        {
            warn!(family = ?family, error = %e, "Cache family invalidation failed, clearing cache");
            self.cache.invalidate_all();
        }
    }

    /// Drop everything, e.g. on logout.
    pub fn invalidate_all(&self) {
        debug!("Invalidating entire cache");
        for family in QueryFamily::ALL {
            self.bump(family);
        }
        self.cache.invalidate_all();
    }

    /// Whether a key currently holds a value.
    #[must_use]
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.cache.contains_key(key)
    }

    fn bump(&self, family: QueryFamily) {
        *self.generations().entry(family).or_insert(0) += 1;
    }

    fn generations(&self) -> std::sync::MutexGuard<'_, HashMap<QueryFamily, u64>> {
        self.generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::models::SellerStats;
    use marketplace_core::Price;

    use super::*;

    fn stats() -> CacheValue {
        CacheValue::SellerStats(SellerStats {
            total_products: 1,
            total_orders: 2,
            total_revenue: Price::from(10_i64),
            pending_orders: 0,
        })
    }

    #[test]
    fn test_key_display_and_family() {
        let key = QueryKey::Cart(UserId::new("u1"));
        assert_eq!(key.to_string(), "cart:u1");
        assert_eq!(key.family(), QueryFamily::Cart);
        assert_eq!(QueryKey::Order(OrderId::new("o1")).family(), QueryFamily::Orders);
        assert_eq!(
            QueryKey::SellerProducts(UserId::new("s1")).family(),
            QueryFamily::Products
        );
    }

    #[tokio::test]
    async fn test_invalidate_family_keeps_other_families() {
        let cache = QueryCache::default();
        cache.insert(QueryKey::AllOrders, CacheValue::Orders(vec![])).await;
        cache.insert(QueryKey::DeletedOrders, CacheValue::Orders(vec![])).await;
        cache.insert(QueryKey::SellerStats, stats()).await;

        cache.invalidate_family(QueryFamily::Orders);

        assert!(cache.get(&QueryKey::AllOrders).await.is_none());
        assert!(cache.get(&QueryKey::DeletedOrders).await.is_none());
        assert!(cache.get(&QueryKey::SellerStats).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_single_key() {
        let cache = QueryCache::default();
        let key = QueryKey::Cart(UserId::new("u1"));
        cache.insert(key.clone(), CacheValue::Cart(Cart::default())).await;
        assert!(cache.contains(&key));

        cache.invalidate(&key).await;
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = QueryCache::default();
        cache.insert(QueryKey::SellerStats, stats()).await;
        cache.invalidate_all();
        assert!(cache.get(&QueryKey::SellerStats).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_started_before_invalidation_is_not_cached() {
        let cache = QueryCache::default();
        let before = cache.generation(&QueryKey::AllOrders);

        // A delete settles while the list request is in flight
        cache.invalidate_family(QueryFamily::Orders);

        let kept = cache
            .insert_fetched(QueryKey::AllOrders, CacheValue::Orders(vec![]), before)
            .await;
        assert!(!kept);
        assert!(cache.get(&QueryKey::AllOrders).await.is_none());

        let after = cache.generation(&QueryKey::AllOrders);
        assert!(
            cache
                .insert_fetched(QueryKey::AllOrders, CacheValue::Orders(vec![]), after)
                .await
        );
        assert!(cache.get(&QueryKey::AllOrders).await.is_some());
    }

    #[tokio::test]
    async fn test_generations_are_per_family() {
        let cache = QueryCache::default();
        let before = cache.generation(&QueryKey::SellerStats);

        cache.invalidate_family(QueryFamily::Orders);
        cache.invalidate(&QueryKey::Cart(UserId::new("u1"))).await;

        assert_eq!(cache.generation(&QueryKey::SellerStats), before);
        assert!(cache.insert_fetched(QueryKey::SellerStats, stats(), before).await);

        cache.invalidate_all();
        assert_ne!(cache.generation(&QueryKey::SellerStats), before);
    }
}
