//! Admin screens: user accounts and feedback moderation.
//!
//! # Usage
//!
//! ```bash
//! # Create a seller account
//! mkt users create -n "Youssef Amrani" -e youssef@example.com -p secret123 -r seller
//!
//! # Promote an existing account
//! mkt users role 665f1c2e9b1d4a0012345678 admin
//!
//! # Reject abusive feedback
//! mkt feedback status 665f... rejected
//! ```

use clap::Subcommand;
use marketplace_client::Marketplace;
use marketplace_client::users::UserForm;
use marketplace_core::{FeedbackId, FeedbackStatus, Role, UserId};

use super::auth::RegisterArgs;
use super::{CommandError, output, require};

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List accounts
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Create an account
    Create(RegisterArgs),
    /// Change an account's role
    Role { id: String, role: Role },
    /// Delete an account
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum FeedbackCommand {
    /// List feedback
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Change a feedback entry's moderation status
    Status { id: String, status: FeedbackStatus },
    /// Delete a feedback entry
    Delete { id: String },
}

/// Run a user administration subcommand.
///
/// # Errors
///
/// Returns guard, validation and request errors.
pub async fn users(app: &Marketplace, action: UserCommand) -> Result<(), CommandError> {
    require(app, "/admin/users")?;
    let service = app.users();
    match action {
        UserCommand::List { page } => output::users(&service.list(page).await?),
        UserCommand::Create(args) => {
            let form = UserForm {
                fullname: args.fullname,
                email: args.email,
                password: args.password,
                role: args.role,
            };
            output::user(&service.create(&form).await?);
        }
        UserCommand::Role { id, role } => service.update_role(&UserId::new(id), role).await?,
        UserCommand::Delete { id } => service.delete(&UserId::new(id)).await?,
    }
    Ok(())
}

/// Run a feedback moderation subcommand.
///
/// # Errors
///
/// Returns guard and request errors.
pub async fn feedback(app: &Marketplace, action: FeedbackCommand) -> Result<(), CommandError> {
    require(app, "/admin/feedback")?;
    let service = app.feedback();
    match action {
        FeedbackCommand::List { page } => output::feedback(&service.list(page).await?),
        FeedbackCommand::Status { id, status } => {
            service.update_status(&FeedbackId::new(id), status).await?;
        }
        FeedbackCommand::Delete { id } => service.delete(&FeedbackId::new(id)).await?,
    }
    Ok(())
}
