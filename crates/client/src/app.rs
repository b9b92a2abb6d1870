//! Application facade.
//!
//! [`Marketplace`] wires the API client, session, store, cache and notifier
//! together and hands out the services built on them.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, instrument};

use crate::api::ApiClient;
use crate::auth::AuthService;
use crate::cache::QueryCache;
use crate::cart::CartSync;
use crate::catalog::{CategoryService, ProductService};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::feedback::FeedbackService;
use crate::notify::{Notifier, TracingNotifier};
use crate::orders::OrderService;
use crate::routes::{self, Navigation};
use crate::session::{FileSessionStore, SessionHandle, SessionStore};
use crate::stats::StatsService;
use crate::store::{AppState, Store};
use crate::users::UserService;

/// Every client service, sharing one session, store and cache.
#[derive(Clone)]
pub struct Marketplace {
    config: ClientConfig,
    session: SessionHandle,
    store: Store,
    cache: QueryCache,
    auth: AuthService,
    cart: CartSync,
    orders: OrderService,
    products: ProductService,
    categories: CategoryService,
    users: UserService,
    feedback: FeedbackService,
    stats: StatsService,
}

impl std::fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Marketplace")
            .field("api_url", &self.config.api_url.as_str())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Marketplace {
    /// Build from configuration, restoring the session from the session file
    /// and logging toasts through `tracing`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session file exists but cannot be read.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let store: Arc<dyn SessionStore> =
            Arc::new(FileSessionStore::new(config.session_file.clone()));
        let session = SessionHandle::restore(store)?;
        Ok(Self::builder(config, session)
            .notifier(Arc::new(TracingNotifier))
            .build())
    }

    /// Start building with an explicit session.
    #[must_use]
    pub fn builder(config: ClientConfig, session: SessionHandle) -> MarketplaceBuilder {
        MarketplaceBuilder {
            config,
            session,
            notifier: Arc::new(TracingNotifier),
            store: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub const fn session(&self) -> &SessionHandle {
        &self.session
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthService {
        &self.auth
    }

    #[must_use]
    pub const fn cart(&self) -> &CartSync {
        &self.cart
    }

    #[must_use]
    pub const fn orders(&self) -> &OrderService {
        &self.orders
    }

    #[must_use]
    pub const fn products(&self) -> &ProductService {
        &self.products
    }

    #[must_use]
    pub const fn categories(&self) -> &CategoryService {
        &self.categories
    }

    #[must_use]
    pub const fn users(&self) -> &UserService {
        &self.users
    }

    #[must_use]
    pub const fn feedback(&self) -> &FeedbackService {
        &self.feedback
    }

    #[must_use]
    pub const fn stats(&self) -> &StatsService {
        &self.stats
    }

    /// Resolve a path against the route table for the current session.
    #[must_use]
    pub fn navigate(&self, path: &str) -> Navigation {
        routes::navigate(path, &self.session.snapshot())
    }

    /// Subscribe to store changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.store.subscribe()
    }

    /// Load the logged-in user's cart, as done when a session starts.
    ///
    /// Does nothing when no user is known.
    ///
    /// # Errors
    ///
    /// Returns the cart fetch error.
    #[instrument(skip(self))]
    pub async fn start_session(&self) -> Result<()> {
        let Some(user) = self.session.user() else {
            debug!("No session to start");
            return Ok(());
        };
        self.cart.load(Some(&user.id)).await?;
        Ok(())
    }
}

/// Builder for [`Marketplace`].
pub struct MarketplaceBuilder {
    config: ClientConfig,
    session: SessionHandle,
    notifier: Arc<dyn Notifier>,
    store: Option<Store>,
}

impl MarketplaceBuilder {
    /// Where toasts go.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Use an existing store instead of an empty one.
    #[must_use]
    pub fn store(mut self, store: Store) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn build(self) -> Marketplace {
        let Self {
            config,
            session,
            notifier,
            store,
        } = self;

        let api = ApiClient::new(config.clone(), Arc::new(session.clone()));
        let store = store.unwrap_or_default();
        let cache = QueryCache::new(config.cache);

        Marketplace {
            auth: AuthService::new(
                api.clone(),
                session.clone(),
                store.clone(),
                cache.clone(),
                Arc::clone(&notifier),
            ),
            cart: CartSync::new(
                api.clone(),
                store.clone(),
                cache.clone(),
                Arc::clone(&notifier),
                session.clone(),
                config.cart_mode,
            ),
            orders: OrderService::new(
                api.clone(),
                store.clone(),
                cache.clone(),
                Arc::clone(&notifier),
            ),
            products: ProductService::new(api.clone(), cache.clone(), Arc::clone(&notifier)),
            categories: CategoryService::new(api.clone(), cache.clone(), Arc::clone(&notifier)),
            users: UserService::new(api.clone(), cache.clone(), Arc::clone(&notifier)),
            feedback: FeedbackService::new(api.clone(), cache.clone(), Arc::clone(&notifier)),
            stats: StatsService::new(api, cache.clone(), notifier),
            config,
            session,
            store,
            cache,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::routes::Route;

    #[tokio::test]
    async fn test_start_session_without_user_sends_nothing() {
        let config = ClientConfig::new("http://127.0.0.1:1/api").unwrap();
        let app = Marketplace::builder(config, SessionHandle::in_memory()).build();
        app.start_session().await.unwrap();
        assert_eq!(app.navigate("/"), Navigation::Render(Route::Home));
        assert_eq!(app.navigate("/cart"), Navigation::Redirect("/"));
    }
}
