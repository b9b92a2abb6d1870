//! REST API client.
//!
//! Every request goes through [`ApiClient`]: it joins paths onto the
//! configured base URL, attaches the bearer token current at call time, and
//! maps non-success responses to [`ClientError`].

mod envelope;

pub use envelope::Envelope;

use std::sync::Arc;

use reqwest::header::{CACHE_CONTROL, HeaderValue};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

/// Source of the bearer token, consulted on every request.
pub trait TokenProvider: Send + Sync {
    /// Current token, or `None` when logged out.
    fn token(&self) -> Option<SecretString>;
}

/// Provider for anonymous clients.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl TokenProvider for Anonymous {
    fn token(&self) -> Option<SecretString> {
        None
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// HTTP client for the marketplace backend.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.inner.config.api_url.as_str())
            .finish_non_exhaustive()
    }
}

/// One outgoing request.
struct Call<'a> {
    method: Method,
    path: &'a str,
    query: &'a [(&'a str, String)],
    body: Option<Value>,
    no_cache: bool,
}

impl<'a> Call<'a> {
    const fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path,
            query: &[],
            body: None,
            no_cache: false,
        }
    }
}

impl ApiClient {
    /// Create a client that reads its token from `tokens` on every call.
    #[must_use]
    pub fn new(config: ClientConfig, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                http: reqwest::Client::new(),
                config,
                tokens,
            }),
        }
    }

    /// Create a client that never sends a token.
    #[must_use]
    pub fn anonymous(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(Anonymous))
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn get(&self, path: &str) -> Result<Envelope> {
        self.execute(Call::new(Method::GET, path)).await
    }

    /// `GET path` with `Cache-Control: no-cache`, bypassing HTTP caches.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn get_fresh(&self, path: &str) -> Result<Envelope> {
        let mut call = Call::new(Method::GET, path);
        call.no_cache = true;
        self.execute(call).await
    }

    /// `GET path?key=value...`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn get_query(&self, path: &str, query: &[(&str, String)]) -> Result<Envelope> {
        let mut call = Call::new(Method::GET, path);
        call.query = query;
        self.execute(call).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized, on transport
    /// failure, or on a non-success status.
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Envelope> {
        self.execute_with_body(Method::POST, path, body).await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized, on transport
    /// failure, or on a non-success status.
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Envelope> {
        self.execute_with_body(Method::PUT, path, body).await
    }

    /// `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized, on transport
    /// failure, or on a non-success status.
    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Envelope> {
        self.execute_with_body(Method::PATCH, path, body).await
    }

    /// `DELETE path`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    pub async fn delete(&self, path: &str) -> Result<Envelope> {
        self.execute(Call::new(Method::DELETE, path)).await
    }

    /// `DELETE path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized, on transport
    /// failure, or on a non-success status.
    pub async fn delete_with_body<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope> {
        self.execute_with_body(Method::DELETE, path, body).await
    }

    async fn execute_with_body<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Envelope> {
        let mut call = Call::new(method, path);
        call.body = Some(serde_json::to_value(body)?);
        self.execute(call).await
    }

    /// Send a request and decode the response into an [`Envelope`].
    #[instrument(skip(self, call), fields(method = %call.method, path = %call.path))]
    async fn execute(&self, call: Call<'_>) -> Result<Envelope> {
        let mut url = self.inner.config.endpoint(call.path)?;
        if !call.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in call.query {
                pairs.append_pair(key, value);
            }
        }

        let mut request = self.inner.http.request(call.method, url);
        if let Some(token) = self.inner.tokens.token() {
            request = request.bearer_auth(token.expose_secret());
        }
        if call.no_cache {
            request = request.header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ClientError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %truncate(&response_text, 500),
                "API returned non-success status"
            );
            return Err(ClientError::status(
                status,
                error_message(status, &response_text),
            ));
        }

        if response_text.trim().is_empty() {
            return Ok(Envelope::new(status, Value::Null));
        }

        let body: Value = match serde_json::from_str(&response_text) {
            Ok(body) => body,
            Err(e) => {
                error!(
                    error = %e,
                    body = %truncate(&response_text, 500),
                    "Failed to parse API response"
                );
                return Err(ClientError::Parse(e));
            }
        };

        debug!(status = %status, "API request succeeded");
        Ok(Envelope::new(status, body))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Human message for a failed response: the server's `message` or `error`
/// field, else the start of the body, else the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_owned))
    });

    from_json
        .or_else(|| {
            let text = body.trim();
            (!text.is_empty() && !text.starts_with('{')).then(|| truncate(text, 200))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_server_message() {
        let msg = error_message(
            StatusCode::BAD_REQUEST,
            r#"{"success":false,"message":"Stock insuffisant"}"#,
        );
        assert_eq!(msg, "Stock insuffisant");

        let msg = error_message(StatusCode::UNAUTHORIZED, r#"{"error":"jwt expired"}"#);
        assert_eq!(msg, "jwt expired");
    }

    #[test]
    fn test_error_message_falls_back() {
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream timed out"),
            "upstream timed out"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
        assert_eq!(error_message(StatusCode::NOT_FOUND, "{}"), "Not Found");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("héllo", 2), "hé");
    }

    #[test]
    fn test_anonymous_has_no_token() {
        assert!(Anonymous.token().is_none());
    }
}
