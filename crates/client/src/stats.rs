//! Seller dashboard statistics.

use std::sync::Arc;

use marketplace_core::models::SellerStats;
use tracing::instrument;

use crate::api::ApiClient;
use crate::cache::{CacheValue, QueryCache, QueryKey};
use crate::error::Result;
use crate::notify::Notifier;
use crate::service::Backend;

/// Read-only statistics for the logged-in seller.
#[derive(Clone)]
pub struct StatsService {
    backend: Backend,
}

impl std::fmt::Debug for StatsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsService").finish_non_exhaustive()
    }
}

impl StatsService {
    #[must_use]
    pub fn new(api: ApiClient, cache: QueryCache, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend: Backend::new(api, cache, notifier),
        }
    }

    /// Dashboard aggregates, cached.
    ///
    /// # Errors
    ///
    /// Returns the request or decoding error.
    #[instrument(skip(self))]
    pub async fn seller(&self) -> Result<SellerStats> {
        let api = &self.backend.api;
        self.backend
            .cached(
                QueryKey::SellerStats,
                |value| match value {
                    CacheValue::SellerStats(stats) => Some(stats),
                    _ => None,
                },
                CacheValue::SellerStats,
                async {
                    api.get("/seller/stats")
                        .await?
                        .field(&["data", "stats"])
                },
            )
            .await
    }
}
