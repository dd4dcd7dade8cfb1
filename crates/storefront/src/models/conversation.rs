//! Support chat conversations and messages.

use chrono::{DateTime, Utc};
use serde::Serialize;

use lavistique_core::{
    ContactId, ConversationId, ConversationStatus, MessageId, MessageRole, VisitorId,
};

use super::ticket::SupportTicket;

/// A chat thread between a visitor and the assistant or staff.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub visitor_id: VisitorId,
    pub contact_id: Option<ContactId>,
    pub email: Option<String>,
    pub status: ConversationStatus,
    /// Set when the visitor asked for a human.
    pub needs_human_review: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: MessageRole,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Conversation with messages, oldest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationWithMessages {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Conversation with messages and any support tickets raised from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
    pub tickets: Vec<SupportTicket>,
}

/// Entry in a visitor's conversation history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub last_message: Option<Message>,
    pub has_open_ticket: bool,
}
