//! Go Marketplace Core - Shared types library.
//!
//! This crate provides the domain types used across all Go Marketplace components:
//! - `cart` - Cart state container and its storage backends
//! - `cli` - Command-line consumer of the cart
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs and prices, plus cart line items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
