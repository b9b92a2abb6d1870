//! Login, registration and profile.

use std::sync::Arc;

use marketplace_core::Email;
use marketplace_core::models::User;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::api::ApiClient;
use crate::cache::{CacheValue, QueryCache, QueryKey};
use crate::error::{ClientError, Result};
use crate::notify::{Notifier, Toast};
use crate::session::SessionHandle;
use crate::store::{Action, Store};
use crate::users::UserForm;

const TOKEN_KEYS: &[&str] = &["token", "accessToken"];
const USER_KEYS: &[&str] = &["user", "data"];

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Authentication against the backend, backed by the persisted session.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<AuthServiceInner>,
}

struct AuthServiceInner {
    api: ApiClient,
    session: SessionHandle,
    store: Store,
    cache: QueryCache,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    #[must_use]
    pub fn new(
        api: ApiClient,
        session: SessionHandle,
        store: Store,
        cache: QueryCache,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(AuthServiceInner {
                api,
                session,
                store,
                cache,
                notifier,
            }),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.inner.session
    }

    /// Log in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed email, otherwise the request,
    /// decoding or storage error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = Email::parse(email).map_err(|e| ClientError::Validation(e.to_string()))?;
        if password.is_empty() {
            return Err(ClientError::Validation("password is required".to_string()));
        }

        let envelope = self
            .inner
            .api
            .post(
                "/auth/login",
                &Credentials {
                    email: email.as_str(),
                    password,
                },
            )
            .await
            .inspect_err(|_| self.inner.notifier.notify(Toast::error("Login failed")))?;

        let token: String = envelope.field(TOKEN_KEYS)?;
        let user: User = envelope.field(USER_KEYS)?;

        // Another account may have used this client before
        self.inner.cache.invalidate_all();
        self.inner.store.dispatch(Action::Reset);
        self.inner.session.begin(token, Some(user.clone()))?;

        info!(user = %user.id, role = %user.role, "Logged in");
        self.inner
            .notifier
            .notify(Toast::success(format!("Welcome, {}", user.fullname)));
        Ok(user)
    }

    /// Create an account from the signup form.
    ///
    /// If the backend answers with a token, the new account is logged in.
    ///
    /// # Errors
    ///
    /// Returns `Validation` without sending anything if the form is invalid,
    /// otherwise the request, decoding or storage error.
    #[instrument(skip(self, form))]
    pub async fn register(&self, form: &UserForm) -> Result<User> {
        let new_user = form.validate()?;
        let envelope = self
            .inner
            .api
            .post("/auth/register", &new_user)
            .await
            .inspect_err(|_| self.inner.notifier.notify(Toast::error("Registration failed")))?;

        let user: User = envelope.field(USER_KEYS)?;
        if let Some(token) = envelope.optional_field::<String>(TOKEN_KEYS)? {
            self.inner.session.begin(token, Some(user.clone()))?;
        }

        info!(user = %user.id, "Registered");
        self.inner
            .notifier
            .notify(Toast::success("Account created"));
        Ok(user)
    }

    /// Fetch the logged-in user's profile and refresh the session copy.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a session, otherwise the request,
    /// decoding or storage error.
    #[instrument(skip(self))]
    pub async fn profile(&self) -> Result<User> {
        if !self.inner.session.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }
        if let Some(CacheValue::Profile(user)) = self.inner.cache.get(&QueryKey::Profile).await {
            return Ok(*user);
        }

        let generation = self.inner.cache.generation(&QueryKey::Profile);
        let user: User = self.inner.api.get("/auth/profile").await?.field(USER_KEYS)?;
        self.inner.session.set_user(user.clone())?;
        self.inner
            .cache
            .insert_fetched(
                QueryKey::Profile,
                CacheValue::Profile(Box::new(user.clone())),
                generation,
            )
            .await;
        Ok(user)
    }

    /// End the session: forget the token, reset the store, drop the cache.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the persisted session cannot be removed.
    /// The in-memory session, store and cache are cleared regardless.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<()> {
        let result = self.inner.session.end();
        self.inner.store.dispatch(Action::Reset);
        self.inner.cache.invalidate_all();
        if let Err(e) = &result {
            warn!(error = %e, "Failed to remove persisted session");
        }
        self.inner.notifier.notify(Toast::success("Logged out"));
        result
    }
}
