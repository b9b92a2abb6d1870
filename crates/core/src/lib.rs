//! Marketplace Core - Shared types library.
//!
//! This crate provides the types used across the marketplace components:
//! - `client` - Typed API client, cart synchronization and store
//! - `cli` - Command-line front end (`mkt`)
//!
//! # Architecture
//!
//! The core crate contains only types and pure helpers - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, roles and statuses
//! - [`models`] - Entities exchanged with the backend (users, carts, orders...)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod types;

pub use types::*;
