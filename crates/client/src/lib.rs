//! Marketplace client library.
//!
//! Typed access to the marketplace REST API, the cart synchronization flow,
//! the application store and role-gated routing. Views (the `mkt` CLI, tests)
//! drive everything through [`Marketplace`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod feedback;
pub mod guard;
pub mod notify;
pub mod orders;
pub mod routes;
pub mod sequence;
pub mod session;
pub mod stats;
pub mod store;
pub mod users;

mod service;

pub use app::{Marketplace, MarketplaceBuilder};
pub use config::{CartMode, ClientConfig};
pub use error::{ClientError, ErrorKind, Result};
