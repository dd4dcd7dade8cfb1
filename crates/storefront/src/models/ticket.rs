//! Support tickets raised from chat conversations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use lavistique_core::{ConversationId, TicketId, TicketPriority, TicketStatus};

use super::conversation::{ConversationWithMessages, Message};

/// Default subject for tickets created without one.
pub const DEFAULT_SUBJECT: &str = "Support Request";

/// Default signature on staff replies.
pub const DEFAULT_STAFF_NAME: &str = "Support Team";

/// A request for a human to follow up on a conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    pub id: TicketId,
    pub conversation_id: ConversationId,
    pub customer_email: String,
    pub subject: String,
    pub reason: Option<String>,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub assigned_to: Option<String>,
    pub internal_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of asking for a ticket on a conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCreation {
    pub ticket: SupportTicket,
    /// A pending ticket already existed and was returned instead.
    pub is_existing: bool,
}

/// Ticket listing entry with the conversation's latest message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSummary {
    #[serde(flatten)]
    pub ticket: SupportTicket,
    pub last_message: Option<Message>,
}

/// Ticket with its full conversation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: SupportTicket,
    pub conversation: Option<ConversationWithMessages>,
}

/// Ticket counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketStats {
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub closed: i64,
    pub total: i64,
}

impl TicketStats {
    /// Fold `(status, count)` rows into totals.
    #[must_use]
    pub fn from_counts(counts: impl IntoIterator<Item = (TicketStatus, i64)>) -> Self {
        let mut stats = Self::default();
        for (status, count) in counts {
            match status {
                TicketStatus::Pending => stats.pending += count,
                TicketStatus::InProgress => stats.in_progress += count,
                TicketStatus::Resolved => stats.resolved += count,
                TicketStatus::Closed => stats.closed += count,
            }
            stats.total += count;
        }
        stats
    }
}

/// Append a timestamped note to existing internal notes.
#[must_use]
pub fn append_note(existing: Option<&str>, note: &str, at: DateTime<Utc>) -> String {
    let entry = format!("[{}] {note}", at.to_rfc3339());
    match existing {
        Some(notes) if !notes.is_empty() => format!("{notes}\n\n{entry}"),
        _ => entry,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_stats_from_counts() {
        let stats = TicketStats::from_counts([
            (TicketStatus::Pending, 3),
            (TicketStatus::Resolved, 2),
            (TicketStatus::Closed, 1),
        ]);
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.in_progress, 0);
        assert_eq!(stats.resolved, 2);
        assert_eq!(stats.closed, 1);
        assert_eq!(stats.total, 6);
    }

    #[test]
    fn test_append_note_first_and_subsequent() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let first = append_note(None, "Called customer", at);
        assert_eq!(first, "[2025-03-01T12:00:00+00:00] Called customer");

        let second = append_note(Some(&first), "Sent replacement", at);
        assert_eq!(
            second,
            "[2025-03-01T12:00:00+00:00] Called customer\n\n[2025-03-01T12:00:00+00:00] Sent replacement"
        );
    }
}
