//! Subcommand implementations.
//!
//! Every command that maps to a guarded page goes through [`require`] first,
//! so the CLI enforces the same role rules as the route table.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;
pub mod output;

use marketplace_client::routes::{Navigation, Route};
use marketplace_client::{ClientError, Marketplace};
use thiserror::Error;

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The current session may not open the page behind this command.
    #[error("Access denied to {path}, log in with a permitted account")]
    AccessDenied { path: String },

    /// Path does not name a page.
    #[error("No page at {0}")]
    NotFound(String),

    /// Request or validation failure from the client library.
    #[error("{}", .0.user_message())]
    Client(#[from] ClientError),
}

/// Check that the current session may open `path`.
///
/// # Errors
///
/// Returns [`CommandError::AccessDenied`] when the guard redirects and
/// [`CommandError::NotFound`] for unknown paths.
pub fn require(app: &Marketplace, path: &str) -> Result<Route, CommandError> {
    match app.navigate(path) {
        Navigation::Render(route) => Ok(route),
        Navigation::Redirect(_) => Err(CommandError::AccessDenied {
            path: path.to_owned(),
        }),
        Navigation::NotFound => Err(CommandError::NotFound(path.to_owned())),
    }
}

/// Print what navigating to `path` resolves to.
pub fn open(app: &Marketplace, path: &str) {
    match app.navigate(path) {
        Navigation::Render(route) => output::line(&format!("{path} -> {route:?}")),
        Navigation::Redirect(to) => output::line(&format!("{path} -> redirect to {to}")),
        Navigation::NotFound => output::line(&format!("{path} -> not found")),
    }
}

/// Show the seller dashboard figures.
///
/// # Errors
///
/// Returns an error if the session is not a seller or the request fails.
pub async fn stats(app: &Marketplace) -> Result<(), CommandError> {
    require(app, "/seller")?;
    let stats = app.stats().seller().await?;
    output::stats(&stats);
    Ok(())
}
