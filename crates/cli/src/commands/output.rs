//! Terminal rendering of marketplace data.

use marketplace_client::notify::{Notifier, Toast, ToastLevel};
use marketplace_client::store::{CartState, CartStatus};
use marketplace_core::models::{Cart, Category, Feedback, Order, Page, Product, SellerStats, User};

/// Prints toasts to stderr so they do not mix with command output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    #[allow(clippy::print_stderr)]
    fn notify(&self, toast: Toast) {
        match toast.level {
            ToastLevel::Success => eprintln!("✓ {}", toast.message),
            ToastLevel::Error => eprintln!("✗ {}", toast.message),
        }
    }
}

#[allow(clippy::print_stdout)]
pub fn user(user: &User) {
    println!("{} <{}>", user.fullname, user.email.as_str());
    println!("  id:   {}", user.id);
    println!("  role: {}", user.role);
}

#[allow(clippy::print_stdout)]
pub fn users(page: &Page<User>) {
    for u in &page.items {
        println!(
            "{:<26} {:<8} {} <{}>",
            u.id.as_str(),
            u.role.as_str(),
            u.fullname,
            u.email.as_str()
        );
    }
    footer(page.page, page.total_pages);
}

#[allow(clippy::print_stdout)]
pub fn product(product: &Product) {
    println!("{} - {}", product.title, product.price);
    println!("  id:    {}", product.id);
    println!("  stock: {}", product.stock);
    if let Some(description) = &product.description {
        println!("  {description}");
    }
}

#[allow(clippy::print_stdout)]
pub fn products(products: &[Product]) {
    for p in products {
        let stock = if p.in_stock() { "" } else { " (out of stock)" };
        println!(
            "{:<26} {:>10}  {}{stock}",
            p.id.as_str(),
            p.price.to_string(),
            p.title
        );
    }
}

pub fn product_page(page: &Page<Product>) {
    products(&page.items);
    footer(page.page, page.total_pages);
}

#[allow(clippy::print_stdout)]
pub fn category(category: &Category) {
    println!("{:<26} {}", category.id.as_str(), category.name);
    if let Some(description) = &category.description {
        println!("  {description}");
    }
}

pub fn categories(page: &Page<Category>) {
    page.items.iter().for_each(category);
    footer(page.page, page.total_pages);
}

#[allow(clippy::print_stdout)]
pub fn cart(state: &CartState) {
    match &state.status {
        CartStatus::Error(message) => println!("Cart unavailable: {message}"),
        _ => cart_lines(&state.cart),
    }
}

#[allow(clippy::print_stdout)]
fn cart_lines(cart: &Cart) {
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for item in &cart.items {
        println!(
            "{:<26} {:>3} x {:>10}  {}",
            item.product.id.as_str(),
            item.quantity,
            item.product.price.to_string(),
            item.product.title.as_deref().unwrap_or("(untitled)")
        );
    }
    println!("{} item(s), total {}", cart.item_count(), cart.total);
}

#[allow(clippy::print_stdout)]
pub fn order(order: &Order) {
    let customer = order
        .customer
        .as_ref()
        .and_then(|c| c.fullname())
        .unwrap_or("-");
    println!("Order {} [{}] {customer}", order.id, order.status);
    for line in &order.items {
        println!(
            "  {:>3} x {:>10}  {}",
            line.quantity,
            line.price.to_string(),
            line.title()
        );
    }
    if !order.coupons.is_empty() {
        println!("  coupons: {}", order.coupons.join(", "));
    }
    println!("  due: {}", order.amount_due());
}

#[allow(clippy::print_stdout)]
pub fn orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders");
    }
    for o in orders {
        println!(
            "{:<26} {:<12} {:>10}",
            o.id.as_str(),
            o.status.as_str(),
            o.amount_due().to_string()
        );
    }
}

#[allow(clippy::print_stdout)]
pub fn feedback(page: &Page<Feedback>) {
    for f in &page.items {
        let author = f.author.as_ref().and_then(|a| a.fullname()).unwrap_or("-");
        println!(
            "{:<26} {:<9} {author}: {}",
            f.id.as_str(),
            f.status.to_string(),
            f.message
        );
    }
    footer(page.page, page.total_pages);
}

#[allow(clippy::print_stdout)]
pub fn stats(stats: &SellerStats) {
    println!("Products:       {}", stats.total_products);
    println!("Orders:         {}", stats.total_orders);
    println!("Pending orders: {}", stats.pending_orders);
    println!("Revenue:        {}", stats.total_revenue);
}

#[allow(clippy::print_stdout)]
pub fn line(text: &str) {
    println!("{text}");
}

#[allow(clippy::print_stdout)]
fn footer(page: u32, total_pages: u32) {
    println!("-- page {page} of {total_pages} --");
}
