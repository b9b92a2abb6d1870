//! Cart commands.
//!
//! Each invocation loads the cart first so the local copy matches the
//! server before a change is applied, then prints the resulting cart.

use clap::Subcommand;
use marketplace_client::Marketplace;
use marketplace_core::ProductId;

use super::{CommandError, output, require};

#[derive(Debug, Subcommand)]
pub enum CartCommand {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Set { product: String, quantity: u32 },
    /// Remove a product's line
    Remove { product: String },
    /// Empty the cart
    Clear,
}

/// Run a cart subcommand.
///
/// # Errors
///
/// Returns guard and request errors.
pub async fn run(app: &Marketplace, action: CartCommand) -> Result<(), CommandError> {
    require(app, "/cart")?;
    let user = app.session().user().map(|u| u.id);
    let cart = app.cart();
    cart.load(user.as_ref()).await?;

    match action {
        CartCommand::Show => {}
        CartCommand::Add { product, quantity } => {
            cart.add_item(&ProductId::new(product), quantity).await?;
        }
        CartCommand::Set { product, quantity } => {
            cart.update_quantity(&ProductId::new(product), quantity)
                .await?;
        }
        CartCommand::Remove { product } => cart.remove_item(&ProductId::new(product)).await?,
        CartCommand::Clear => cart.clear().await?,
    }

    output::cart(&cart.snapshot());
    Ok(())
}
