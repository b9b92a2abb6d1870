//! Marketplace CLI - browse, shop and administer the marketplace.
//!
//! # Usage
//!
//! ```bash
//! # Log in (the session is kept in MARKETPLACE_SESSION_FILE)
//! mkt login -e shopper@example.com -p secret
//!
//! # Browse the catalog
//! mkt products list --page 2
//!
//! # Manage the cart
//! mkt cart add 665f1c2e9b1d4a0012345678 --quantity 2
//! mkt cart set 665f1c2e9b1d4a0012345678 5
//!
//! # Check out with coupons
//! mkt orders create --coupon SPRING10
//!
//! # Admin: soft-delete and restore orders
//! mkt orders delete 665f...
//! mkt orders restore 665f...
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `logout`, `profile` - Session management
//! - `open` - Resolve a page path against the route guard
//! - `products`, `categories` - Catalog
//! - `cart` - Cart synchronization
//! - `orders` - Checkout, order history and admin order management
//! - `users`, `feedback` - Admin screens
//! - `stats` - Seller dashboard

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use marketplace_client::session::{FileSessionStore, SessionHandle, SessionStore};
use marketplace_client::{ClientConfig, Marketplace};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::admin::{FeedbackCommand, UserCommand};
use commands::auth::{LoginArgs, RegisterArgs};
use commands::cart::CartCommand;
use commands::catalog::{CategoryCommand, ProductCommand};
use commands::orders::OrderCommand;
use commands::output::ConsoleNotifier;

#[derive(Parser)]
#[command(name = "mkt")]
#[command(author, version, about = "Marketplace command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the session
    Login(LoginArgs),
    /// Create an account
    Register(RegisterArgs),
    /// Forget the persisted session
    Logout,
    /// Show the logged-in user's profile
    Profile,
    /// Resolve a page path for the current session
    Open {
        /// Page path, e.g. `/admin/users`
        path: String,
    },
    /// Browse and manage products
    Products {
        #[command(subcommand)]
        action: ProductCommand,
    },
    /// Browse and manage categories
    Categories {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },
    /// Checkout and order management
    Orders {
        #[command(subcommand)]
        action: OrderCommand,
    },
    /// Manage user accounts (admin)
    Users {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Moderate feedback (admin)
    Feedback {
        #[command(subcommand)]
        action: FeedbackCommand,
    },
    /// Seller dashboard statistics
    Stats,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("SENTRY_ENVIRONMENT")
                .ok()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Log directives used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "marketplace_client=info,marketplace_cli=info";

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env before reading SENTRY_DSN
    let _ = dotenvy::dotenv();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry();

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from_env()?;
    let store: Arc<dyn SessionStore> =
        Arc::new(FileSessionStore::new(config.session_file.clone()));
    let session = SessionHandle::restore(store)?;
    let app = Marketplace::builder(config, session)
        .notifier(Arc::new(ConsoleNotifier))
        .build();

    match cli.command {
        Commands::Login(args) => commands::auth::login(&app, &args).await?,
        Commands::Register(args) => commands::auth::register(&app, &args).await?,
        Commands::Logout => commands::auth::logout(&app)?,
        Commands::Profile => commands::auth::profile(&app).await?,
        Commands::Open { path } => commands::open(&app, &path),
        Commands::Products { action } => commands::catalog::products(&app, action).await?,
        Commands::Categories { action } => commands::catalog::categories(&app, action).await?,
        Commands::Cart { action } => commands::cart::run(&app, action).await?,
        Commands::Orders { action } => commands::orders::run(&app, action).await?,
        Commands::Users { action } => commands::admin::users(&app, action).await?,
        Commands::Feedback { action } => commands::admin::feedback(&app, action).await?,
        Commands::Stats => commands::stats(&app).await?,
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn test_default_filter_logs_client_at_info() {
        let directives: Vec<&str> = DEFAULT_LOG_FILTER.split(',').collect();
        assert!(directives.contains(&"marketplace_client=info"));
        assert!(directives.contains(&"marketplace_cli=info"));

        let filter = EnvFilter::try_new(DEFAULT_LOG_FILTER).expect("valid directives");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }
}
