//! Plumbing shared by the CRUD services.

use std::future::Future;
use std::sync::Arc;

use tracing::error;

use crate::api::ApiClient;
use crate::cache::{CacheValue, QueryCache, QueryFamily, QueryKey};
use crate::error::Result;
use crate::notify::{Notifier, Toast};

/// API client, cache and notifier bundled for the CRUD services.
#[derive(Clone)]
pub(crate) struct Backend {
    pub(crate) api: ApiClient,
    pub(crate) cache: QueryCache,
    pub(crate) notifier: Arc<dyn Notifier>,
}

impl Backend {
    pub(crate) fn new(api: ApiClient, cache: QueryCache, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            cache,
            notifier,
        }
    }

    /// Serve `key` from the cache, or run `fetch` and cache its result.
    ///
    /// Failures are returned as-is and never cached, and neither is a result
    /// whose family was invalidated while the request was in flight.
    pub(crate) async fn cached<T, Fut>(
        &self,
        key: QueryKey,
        unwrap: fn(CacheValue) -> Option<T>,
        wrap: fn(T) -> CacheValue,
        fetch: Fut,
    ) -> Result<T>
    where
        T: Clone,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(value) = self.cache.get(&key).await.and_then(unwrap) {
            return Ok(value);
        }
        let generation = self.cache.generation(&key);
        match fetch.await {
            Ok(value) => {
                self.cache
                    .insert_fetched(key, wrap(value.clone()), generation)
                    .await;
                Ok(value)
            }
            Err(e) => {
                error!(key = %key, error = %e, "Query failed");
                Err(e)
            }
        }
    }

    /// Report a mutation outcome: invalidate `family` and toast on success,
    /// log and toast on failure.
    pub(crate) fn settle<T>(
        &self,
        result: Result<T>,
        family: QueryFamily,
        success: &str,
        failure: &str,
    ) -> Result<T> {
        match result {
            Ok(value) => {
                self.cache.invalidate_family(family);
                self.notifier.notify(Toast::success(success));
                Ok(value)
            }
            Err(e) => {
                error!(family = ?family, error = %e, "Mutation failed");
                self.notifier
                    .notify(Toast::error(format!("{failure}: {}", e.user_message())));
                Err(e)
            }
        }
    }
}
