//! La Vistique Core - domain types and pricing rules.
//!
//! Shared by the storefront server and the operational CLI. The crate holds
//! no I/O: no database access and no HTTP clients. Enable the `postgres`
//! feature for `sqlx` encodings of IDs and emails.
//!
//! # Modules
//!
//! - [`types`] - IDs, emails, statuses, locale and prices
//! - [`discount`] - promo code rules and the discount calculator
//! - [`wizard`] - the portrait configurator
//! - [`cart`] - cart upsell helpers
//! - [`chat`] - support chat prompt and canned replies

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod chat;
pub mod discount;
pub mod types;
pub mod wizard;

pub use types::*;
