//! Order commands.
//!
//! # Usage
//!
//! ```bash
//! mkt orders create --coupon SPRING10 --coupon VIP
//! mkt orders mine
//! mkt orders all                 # admin
//! mkt orders status <id> shipped # admin
//! ```

use clap::Subcommand;
use marketplace_client::{ClientError, Marketplace};
use marketplace_core::{OrderId, OrderStatus};

use super::{CommandError, output, require};

#[derive(Debug, Subcommand)]
pub enum OrderCommand {
    /// Place an order for the current cart
    Create {
        /// Coupon code, may be repeated
        #[arg(long = "coupon")]
        coupons: Vec<String>,
    },
    /// The logged-in user's orders
    Mine,
    /// Every live order (admin)
    All,
    /// Soft-deleted orders (admin)
    Deleted,
    /// Orders containing the seller's products
    Seller,
    /// Show one order
    Show { id: String },
    /// Soft-delete an order (admin)
    Delete { id: String },
    /// Restore a soft-deleted order (admin)
    Restore { id: String },
    /// Change an order's status (admin)
    Status { id: String, status: OrderStatus },
}

/// Run an order subcommand.
///
/// # Errors
///
/// Returns guard and request errors.
pub async fn run(app: &Marketplace, action: OrderCommand) -> Result<(), CommandError> {
    let service = app.orders();
    match action {
        OrderCommand::Create { coupons } => {
            require(app, "/cart")?;
            let user = app.session().user().map(|u| u.id);
            let order = service.create(&coupons, user.as_ref()).await?;
            output::order(&order);
        }
        OrderCommand::Mine => {
            require(app, "/client/orders")?;
            let user = app.session().user().ok_or(ClientError::NotAuthenticated)?;
            output::orders(&service.fetch_mine(&user.id).await?);
        }
        OrderCommand::All => {
            require(app, "/orders")?;
            output::orders(&service.fetch_all().await?);
        }
        OrderCommand::Deleted => {
            require(app, "/orders/deleted")?;
            output::orders(&service.fetch_deleted().await?);
        }
        OrderCommand::Seller => {
            require(app, "/seller")?;
            output::orders(&service.seller_orders().await?);
        }
        OrderCommand::Show { id } => {
            require(app, "/client/orders")?;
            output::order(&service.get(&OrderId::new(id)).await?);
        }
        OrderCommand::Delete { id } => {
            require(app, "/orders")?;
            service.delete(&OrderId::new(id)).await?;
        }
        OrderCommand::Restore { id } => {
            require(app, "/orders/deleted")?;
            service.restore(&OrderId::new(id)).await?;
        }
        OrderCommand::Status { id, status } => {
            require(app, "/orders")?;
            service.update_status(&OrderId::new(id), status).await?;
        }
    }
    Ok(())
}
