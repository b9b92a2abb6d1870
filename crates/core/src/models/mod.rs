//! Domain models exchanged with the marketplace backend.
//!
//! Field names follow the backend's JSON (`_id`, camelCase, populated
//! references), mapped to idiomatic Rust names with serde attributes.

pub mod cart;
pub mod category;
pub mod feedback;
pub mod order;
pub mod page;
pub mod product;
pub mod stats;
pub mod user;

pub use cart::{Cart, CartItem, CartProduct};
pub use category::{Category, CategoryInput, CategoryRef};
pub use feedback::{Feedback, FeedbackUpdate};
pub use order::{CreateOrder, Order, OrderLine, OrderProduct};
pub use page::Page;
pub use product::{Product, ProductInput};
pub use stats::SellerStats;
pub use user::{NewUser, User, UserRef, UserSummary};
