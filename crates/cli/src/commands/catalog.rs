//! Product and category commands.
//!
//! Browsing is public. Creating, editing and deleting require a seller or
//! admin session for products and an admin session for categories.

use clap::{Args, Subcommand};
use marketplace_client::Marketplace;
use marketplace_core::models::{CategoryInput, ProductInput};
use marketplace_core::{CategoryId, Price, ProductId, UserId};

use super::{CommandError, output, require};

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// List products
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one product
    Show { id: String },
    /// List a seller's products (defaults to the logged-in seller)
    Seller { id: Option<String> },
    /// Create a product
    Create(ProductArgs),
    /// Update fields of a product
    Update {
        id: String,
        #[command(flatten)]
        fields: ProductArgs,
    },
    /// Delete a product
    Delete { id: String },
}

#[derive(Debug, Clone, Args)]
pub struct ProductArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Unit price, e.g. `19.99`
    #[arg(long)]
    pub price: Option<Price>,
    #[arg(long)]
    pub stock: Option<u32>,
    /// Category id
    #[arg(long)]
    pub category: Option<String>,
    /// Hosted image URL
    #[arg(long)]
    pub image: Option<String>,
}

impl From<ProductArgs> for ProductInput {
    fn from(args: ProductArgs) -> Self {
        Self {
            title: args.title,
            description: args.description,
            price: args.price,
            stock: args.stock,
            category: args.category,
            primary_image: args.image,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// List categories
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Show one category
    Show { id: String },
    /// Create a category
    Create(CategoryArgs),
    /// Update a category
    Update {
        id: String,
        #[command(flatten)]
        fields: CategoryArgs,
    },
    /// Delete a category
    Delete { id: String },
}

#[derive(Debug, Clone, Args)]
pub struct CategoryArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

impl From<CategoryArgs> for CategoryInput {
    fn from(args: CategoryArgs) -> Self {
        Self {
            name: args.name,
            description: args.description,
        }
    }
}

/// Sellers manage their own listings, admins manage all of them.
fn require_product_manager(app: &Marketplace) -> Result<(), CommandError> {
    require(app, "/admin/products")
        .or_else(|_| require(app, "/seller"))
        .map(|_| ())
}

/// Run a product subcommand.
///
/// # Errors
///
/// Returns guard, validation and request errors.
pub async fn products(app: &Marketplace, action: ProductCommand) -> Result<(), CommandError> {
    let service = app.products();
    match action {
        ProductCommand::List { page } => output::product_page(&service.list(page).await?),
        ProductCommand::Show { id } => output::product(&service.get(&ProductId::new(id)).await?),
        ProductCommand::Seller { id } => {
            let seller = match id {
                Some(id) => UserId::new(id),
                None => {
                    require(app, "/seller")?;
                    app.session()
                        .user()
                        .map(|u| u.id)
                        .ok_or(marketplace_client::ClientError::NotAuthenticated)?
                }
            };
            output::products(&service.by_seller(&seller).await?);
        }
        ProductCommand::Create(args) => {
            require_product_manager(app)?;
            output::product(&service.create(&args.into()).await?);
        }
        ProductCommand::Update { id, fields } => {
            require_product_manager(app)?;
            let product = service.update(&ProductId::new(id), &fields.into()).await?;
            output::product(&product);
        }
        ProductCommand::Delete { id } => {
            require_product_manager(app)?;
            service.delete(&ProductId::new(id)).await?;
        }
    }
    Ok(())
}

/// Run a category subcommand.
///
/// # Errors
///
/// Returns guard, validation and request errors.
pub async fn categories(app: &Marketplace, action: CategoryCommand) -> Result<(), CommandError> {
    let service = app.categories();
    match action {
        CategoryCommand::List { page } => output::categories(&service.list(page).await?),
        CategoryCommand::Show { id } => {
            output::category(&service.get(&CategoryId::new(id)).await?);
        }
        CategoryCommand::Create(args) => {
            require(app, "/admin/categories")?;
            output::category(&service.create(&args.into()).await?);
        }
        CategoryCommand::Update { id, fields } => {
            require(app, "/admin/categories")?;
            let category = service.update(&CategoryId::new(id), &fields.into()).await?;
            output::category(&category);
        }
        CategoryCommand::Delete { id } => {
            require(app, "/admin/categories")?;
            service.delete(&CategoryId::new(id)).await?;
        }
    }
    Ok(())
}
