//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! mkt login -e shopper@example.com -p secret
//! mkt register -n "Salma Idrissi" -e salma@example.com -p secret123 -r user
//! mkt profile
//! mkt logout
//! ```

use clap::Args;
use marketplace_client::Marketplace;
use marketplace_client::users::UserForm;

use super::{CommandError, output};

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email
    #[arg(short, long)]
    pub email: String,

    /// Account password
    #[arg(short, long, env = "MARKETPLACE_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Full name
    #[arg(short = 'n', long)]
    pub fullname: String,

    #[arg(short, long)]
    pub email: String,

    #[arg(short, long, env = "MARKETPLACE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// `user` or `seller`
    #[arg(short, long, default_value = "user")]
    pub role: String,
}

/// Log in, then load the cart for the new session.
///
/// # Errors
///
/// Returns the login error; a failed cart load is only reported.
pub async fn login(app: &Marketplace, args: &LoginArgs) -> Result<(), CommandError> {
    let user = app.auth().login(&args.email, &args.password).await?;
    output::user(&user);
    if let Err(e) = app.start_session().await {
        tracing::warn!(error = %e, "Cart not loaded after login");
    }
    Ok(())
}

/// Create an account.
///
/// # Errors
///
/// Returns validation errors before any request and request errors after.
pub async fn register(app: &Marketplace, args: &RegisterArgs) -> Result<(), CommandError> {
    let form = UserForm {
        fullname: args.fullname.clone(),
        email: args.email.clone(),
        password: args.password.clone(),
        role: args.role.clone(),
    };
    let user = app.auth().register(&form).await?;
    output::user(&user);
    Ok(())
}

/// Forget the stored session.
///
/// # Errors
///
/// Returns an error if the session file cannot be removed.
pub fn logout(app: &Marketplace) -> Result<(), CommandError> {
    app.auth().logout()?;
    Ok(())
}

/// Show the logged-in user.
///
/// # Errors
///
/// Returns an error when logged out or the request fails.
pub async fn profile(app: &Marketplace) -> Result<(), CommandError> {
    super::require(app, "/client/profile")?;
    let user = app.auth().profile().await?;
    output::user(&user);
    Ok(())
}
