//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `MARKETPLACE_API_URL` - Backend REST base URL (default: `http://localhost:3001/api`)
//! - `MARKETPLACE_ASSET_URL` - Base URL for uploaded images (default: API origin)
//! - `MARKETPLACE_SESSION_FILE` - Where the token and user are persisted
//!   (default: `.marketplace-session.json`)
//! - `MARKETPLACE_CART_MODE` - `confirmed` or `optimistic` (default: `confirmed`)
//! - `MARKETPLACE_CACHE_TTL_SECS` - Request cache TTL (default: 300)
//! - `MARKETPLACE_CACHE_CAPACITY` - Request cache size (default: 1000)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:3001/api";
const DEFAULT_SESSION_FILE: &str = ".marketplace-session.json";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// When cart changes become visible locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CartMode {
    /// Apply changes only once the server confirmed them.
    #[default]
    Confirmed,
    /// Apply changes immediately and roll back if the server rejects them.
    Optimistic,
}

impl std::str::FromStr for CartMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(Self::Confirmed),
            "optimistic" => Ok(Self::Optimistic),
            other => Err(format!("expected confirmed or optimistic, got {other}")),
        }
    }
}

/// Request cache sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Marketplace client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend REST base URL, without trailing slash.
    pub api_url: Url,
    /// Base URL that relative image paths are resolved against.
    pub asset_url: Url,
    /// Path of the persisted session file.
    pub session_file: PathBuf,
    /// Cart update strategy.
    pub cart_mode: CartMode,
    /// Request cache sizing.
    pub cache: CacheConfig,
}

impl ClientConfig {
    /// Configuration pointing at `api_url` with every other setting defaulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_url` is not an absolute URL.
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        let api_url = parse_url("MARKETPLACE_API_URL", api_url)?;
        let asset_url = origin_of(&api_url);
        Ok(Self {
            api_url,
            asset_url,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            cart_mode: CartMode::default(),
            cache: CacheConfig::default(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("MARKETPLACE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut config = Self::new(&api_url)?;

        if let Some(asset_url) = lookup("MARKETPLACE_ASSET_URL") {
            config.asset_url = parse_url("MARKETPLACE_ASSET_URL", &asset_url)?;
        }
        if let Some(path) = lookup("MARKETPLACE_SESSION_FILE") {
            config.session_file = PathBuf::from(path);
        }
        if let Some(mode) = lookup("MARKETPLACE_CART_MODE") {
            config.cart_mode = mode.parse().map_err(|e| {
                ConfigError::InvalidEnvVar("MARKETPLACE_CART_MODE".to_string(), e)
            })?;
        }
        if let Some(ttl) = lookup("MARKETPLACE_CACHE_TTL_SECS") {
            config.cache.ttl = Duration::from_secs(parse_number("MARKETPLACE_CACHE_TTL_SECS", &ttl)?);
        }
        if let Some(capacity) = lookup("MARKETPLACE_CACHE_CAPACITY") {
            config.cache.capacity = parse_number("MARKETPLACE_CACHE_CAPACITY", &capacity)?;
        }

        Ok(config)
    }

    /// Full URL of an API path such as `/cart` or `/orders/42`.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined string is not a valid URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        let base = self.api_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
    }

    /// Resolve an image path returned by the backend.
    ///
    /// Absolute URLs are returned unchanged.
    #[must_use]
    pub fn asset(&self, path: &str) -> String {
        if Url::parse(path).is_ok() {
            return path.to_string();
        }
        self.asset_url
            .join(path)
            .map_or_else(|_| path.to_string(), String::from)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}

fn parse_number(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Scheme, host and port of a URL, with an empty path.
fn origin_of(url: &Url) -> Url {
    let mut origin = url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.api_url.as_str(), "http://localhost:3001/api");
        assert_eq!(config.asset_url.as_str(), "http://localhost:3001/");
        assert_eq!(config.cart_mode, CartMode::Confirmed);
        assert_eq!(config.cache, CacheConfig::default());
        assert_eq!(config.session_file, PathBuf::from(".marketplace-session.json"));
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("MARKETPLACE_API_URL", "https://api.example.com/v1/"),
            ("MARKETPLACE_ASSET_URL", "https://cdn.example.com"),
            ("MARKETPLACE_CART_MODE", "Optimistic"),
            ("MARKETPLACE_CACHE_TTL_SECS", "30"),
            ("MARKETPLACE_CACHE_CAPACITY", "50"),
        ]))
        .unwrap();

        assert_eq!(config.cart_mode, CartMode::Optimistic);
        assert_eq!(config.cache.ttl, Duration::from_secs(30));
        assert_eq!(config.cache.capacity, 50);
        assert_eq!(
            config.endpoint("/cart").unwrap().as_str(),
            "https://api.example.com/v1/cart"
        );
        assert_eq!(
            config.asset("/uploads/a.jpg"),
            "https://cdn.example.com/uploads/a.jpg"
        );
    }

    #[test]
    fn test_invalid_values() {
        let err = ClientConfig::from_lookup(lookup_from(&[("MARKETPLACE_CART_MODE", "eager")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "MARKETPLACE_CART_MODE"));

        let err = ClientConfig::from_lookup(lookup_from(&[("MARKETPLACE_API_URL", "not a url")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));

        let err =
            ClientConfig::from_lookup(lookup_from(&[("MARKETPLACE_CACHE_TTL_SECS", "-1")]))
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = ClientConfig::new("http://localhost:3001/api").unwrap();
        assert_eq!(
            config.endpoint("orders/42/status").unwrap().as_str(),
            "http://localhost:3001/api/orders/42/status"
        );
    }

    #[test]
    fn test_asset_keeps_absolute_urls() {
        let config = ClientConfig::new("http://localhost:3001/api").unwrap();
        assert_eq!(
            config.asset("https://img.example.com/x.png"),
            "https://img.example.com/x.png"
        );
        assert_eq!(
            config.asset("/uploads/x.png"),
            "http://localhost:3001/uploads/x.png"
        );
    }
}
