//! Session-related types.
//!
//! The session is the only identity an anonymous shopper has: it holds the
//! visitor ID that keys chat conversations and locale preferences, plus the
//! Shopify cart ID and the in-progress portrait configuration.

use serde::{Deserialize, Serialize};

use lavistique_core::VisitorId;

/// Session-stored visitor identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurrentVisitor {
    pub id: VisitorId,
}

/// Session keys.
pub mod keys {
    /// Key for the anonymous visitor identity.
    pub const VISITOR: &str = "visitor";

    /// Key for storing the Shopify cart ID.
    pub const CART_ID: &str = "cart_id";

    /// Key for the portrait wizard state.
    pub const WIZARD: &str = "wizard";
}
