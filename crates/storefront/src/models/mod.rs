//! Domain models for storefront-local data.
//!
//! Rows live in the `storefront` schema; Shopify owns everything else.

pub mod contact;
pub mod conversation;
pub mod preference;
pub mod session;
pub mod ticket;

use serde::Serialize;

pub use contact::{
    Contact, ContactDetail, ContactFilter, ContactUpdate, MailingList, SubscribeResult, Tag,
};
pub use conversation::{
    Conversation, ConversationDetail, ConversationSummary, ConversationWithMessages, Message,
};
pub use preference::UserPreference;
pub use session::{CurrentVisitor, keys};
pub use ticket::{SupportTicket, TicketCreation, TicketDetail, TicketStats, TicketSummary};

/// One page of an offset-paginated listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page, deriving `has_more` from the offset and total.
    #[must_use]
    pub fn new(items: Vec<T>, total: i64, offset: i64) -> Self {
        let shown = i64::try_from(items.len()).unwrap_or(i64::MAX);
        Self {
            has_more: offset.saturating_add(shown) < total,
            items,
            total,
        }
    }
}

/// Clamp a caller-supplied page size into `1..=100`, defaulting to 50.
#[must_use]
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 100)
}
