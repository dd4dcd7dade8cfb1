//! Status enums for CRM, support, and promotion entities.
//!
//! Every enum is stored as `TEXT` in `PostgreSQL` using its snake_case name
//! and serialized the same way over JSON.

use serde::{Deserialize, Serialize};

/// Error returned when a stored or submitted status string is unknown.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored/serialized name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseStatusError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseStatusError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Email subscription lifecycle of a contact.
    ContactStatus("contact status") {
        Subscribed => "subscribed",
        Unsubscribed => "unsubscribed",
        /// Hard bounce reported by the mail provider.
        Bounced => "bounced",
        /// Removed during list hygiene.
        Cleaned => "cleaned",
    }
}

impl Default for ContactStatus {
    fn default() -> Self {
        Self::Subscribed
    }
}

string_enum! {
    /// Lifecycle of a chat conversation.
    ConversationStatus("conversation status") {
        Active => "active",
        Resolved => "resolved",
        Archived => "archived",
    }
}

impl Default for ConversationStatus {
    fn default() -> Self {
        Self::Active
    }
}

string_enum! {
    /// Author of a chat message.
    MessageRole("message role") {
        /// The site visitor.
        User => "user",
        /// The automated assistant.
        Assistant => "assistant",
        System => "system",
        /// A human support agent replying to a ticket.
        Staff => "staff",
    }
}

string_enum! {
    /// Support ticket workflow status.
    TicketStatus("ticket status") {
        Pending => "pending",
        InProgress => "in_progress",
        Resolved => "resolved",
        Closed => "closed",
    }
}

impl Default for TicketStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TicketStatus {
    /// Whether the ticket is finished (these statuses stamp `resolved_at`).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    /// Whether the ticket still needs staff attention.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

string_enum! {
    /// Support ticket urgency.
    TicketPriority("ticket priority") {
        Low => "low",
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
}

impl Default for TicketPriority {
    fn default() -> Self {
        Self::Normal
    }
}

string_enum! {
    /// How a discount reduces the price.
    DiscountKind("discount type") {
        /// `value` is a whole percent.
        Percentage => "percentage",
        /// `value` is an amount in cents.
        FixedAmount => "fixed_amount",
    }
}

string_enum! {
    /// Which products a discount applies to.
    DiscountScope("discount scope") {
        All => "all",
        Collection => "collection",
        Product => "product",
    }
}

impl Default for DiscountScope {
    fn default() -> Self {
        Self::All
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_status_round_trip_strings() {
        for status in TicketStatus::ALL {
            let parsed: TicketStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, *status);
        }
        assert_eq!(TicketStatus::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "archived".parse::<TicketStatus>().unwrap_err();
        assert_eq!(err.kind, "ticket status");
        assert_eq!(err.to_string(), "invalid ticket status: archived");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TicketStatus::Resolved.is_terminal());
        assert!(TicketStatus::Closed.is_terminal());
        assert!(!TicketStatus::Pending.is_terminal());
        assert!(TicketStatus::InProgress.is_open());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ContactStatus::default(), ContactStatus::Subscribed);
        assert_eq!(ConversationStatus::default(), ConversationStatus::Active);
        assert_eq!(TicketPriority::default(), TicketPriority::Normal);
        assert_eq!(DiscountScope::default(), DiscountScope::All);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&DiscountKind::FixedAmount).unwrap();
        assert_eq!(json, "\"fixed_amount\"");
        let role: MessageRole = serde_json::from_str("\"staff\"").unwrap();
        assert_eq!(role, MessageRole::Staff);
    }
}
