//! Database operations for support chat conversations and messages.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use tracing::instrument;
use uuid::Uuid;

use lavistique_core::{
    ContactId, ConversationId, ConversationStatus, Email, MessageId, MessageRole, VisitorId,
};

use super::tickets::{TicketRow, TICKET_COLUMNS};
use super::{RepositoryError, parse_column};
use crate::models::{
    Conversation, ConversationDetail, ConversationSummary, ConversationWithMessages, Message,
};

/// Messages returned when resuming a conversation.
pub const RESUME_MESSAGE_LIMIT: i64 = 50;

/// Messages returned when viewing a conversation in full.
pub const DETAIL_MESSAGE_LIMIT: i64 = 100;

pub(super) const CONVERSATION_COLUMNS: &str =
    "id, visitor_id, contact_id, email, status, needs_human_review, created_at, updated_at";

pub(super) const MESSAGE_COLUMNS: &str =
    "id, conversation_id, role, content, metadata, created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ConversationRow {
    id: Uuid,
    visitor_id: Uuid,
    contact_id: Option<Uuid>,
    email: Option<String>,
    status: String,
    needs_human_review: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = RepositoryError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ConversationId::from_uuid(row.id),
            visitor_id: VisitorId::from_uuid(row.visitor_id),
            contact_id: row.contact_id.map(ContactId::from_uuid),
            email: row.email,
            status: parse_column("status", &row.status)?,
            needs_human_review: row.needs_human_review,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    role: String,
    content: String,
    metadata: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = RepositoryError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: MessageId::from_uuid(row.id),
            conversation_id: ConversationId::from_uuid(row.conversation_id),
            role: parse_column("role", &row.role)?,
            content: row.content,
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}

/// Newest `limit` messages of a conversation, returned oldest first.
pub(super) async fn recent_messages<'e, E>(
    executor: E,
    conversation: ConversationId,
    limit: i64,
) -> Result<Vec<Message>, RepositoryError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let rows = sqlx::query_as::<_, MessageRow>(&format!(
        r"
        SELECT {MESSAGE_COLUMNS}
        FROM storefront.message
        WHERE conversation_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "
    ))
    .bind(conversation)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    let mut messages = rows
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<Vec<Message>, _>>()?;
    messages.reverse();
    Ok(messages)
}

/// Most recent message of a conversation.
pub(super) async fn last_message(
    pool: &PgPool,
    conversation: ConversationId,
) -> Result<Option<Message>, RepositoryError> {
    let row = sqlx::query_as::<_, MessageRow>(&format!(
        r"
        SELECT {MESSAGE_COLUMNS}
        FROM storefront.message
        WHERE conversation_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        "
    ))
    .bind(conversation)
    .fetch_optional(pool)
    .await?;

    row.map(TryInto::try_into).transpose()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for chat conversations.
pub struct ConversationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ConversationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Resume the visitor's latest active conversation or start a new one.
    ///
    /// When `email` is given and the resumed conversation has none yet, it is
    /// stored (lowercased).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self, email), fields(visitor_id = %visitor))]
    pub async fn get_or_create(
        &self,
        visitor: VisitorId,
        email: Option<&Email>,
    ) -> Result<ConversationWithMessages, RepositoryError> {
        let existing = sqlx::query_as::<_, ConversationRow>(&format!(
            r"
            SELECT {CONVERSATION_COLUMNS}
            FROM storefront.conversation
            WHERE visitor_id = $1 AND status = 'active'
            ORDER BY updated_at DESC
            LIMIT 1
            "
        ))
        .bind(visitor)
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = existing {
            let mut conversation: Conversation = row.try_into()?;

            if let Some(email) = email
                && conversation.email.is_none()
            {
                sqlx::query(
                    "UPDATE storefront.conversation SET email = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(conversation.id)
                .bind(email.as_str())
                .execute(self.pool)
                .await?;
                conversation.email = Some(email.as_str().to_string());
            }

            let messages =
                recent_messages(self.pool, conversation.id, RESUME_MESSAGE_LIMIT).await?;
            return Ok(ConversationWithMessages {
                conversation,
                messages,
            });
        }

        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            r"
            INSERT INTO storefront.conversation (id, visitor_id, email)
            VALUES ($1, $2, $3)
            RETURNING {CONVERSATION_COLUMNS}
            "
        ))
        .bind(ConversationId::new())
        .bind(visitor)
        .bind(email.map(Email::as_str))
        .fetch_one(self.pool)
        .await?;

        tracing::info!("Started new conversation");

        Ok(ConversationWithMessages {
            conversation: row.try_into()?,
            messages: Vec::new(),
        })
    }

    /// Fetch a conversation by ID without messages.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, id: ConversationId) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM storefront.conversation WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a conversation with up to 100 messages and its tickets.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(
        &self,
        id: ConversationId,
    ) -> Result<Option<ConversationDetail>, RepositoryError> {
        let Some(conversation) = self.find(id).await? else {
            return Ok(None);
        };

        let messages = recent_messages(self.pool, id, DETAIL_MESSAGE_LIMIT).await?;

        let tickets = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            SELECT {TICKET_COLUMNS}
            FROM storefront.support_ticket
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            "
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ConversationDetail {
            conversation,
            messages,
            tickets,
        }))
    }

    /// Append a message and touch the conversation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the conversation doesn't exist.
    #[instrument(
        skip(self, content, metadata),
        fields(conversation_id = %conversation, role = %role)
    )]
    pub async fn add_message(
        &self,
        conversation: ConversationId,
        role: MessageRole,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query(
            "UPDATE storefront.conversation SET updated_at = NOW() WHERE id = $1",
        )
        .bind(conversation)
        .execute(&mut *tx)
        .await?;
        if touched.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r"
            INSERT INTO storefront.message (id, conversation_id, role, content, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(MessageId::new())
        .bind(conversation)
        .bind(role.as_str())
        .bind(content)
        .bind(metadata)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Store the visitor's email and link the matching contact, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the conversation doesn't exist.
    pub async fn update_email(
        &self,
        conversation: ConversationId,
        email: &Email,
    ) -> Result<Conversation, RepositoryError> {
        let row = sqlx::query_as::<_, ConversationRow>(&format!(
            r"
            UPDATE storefront.conversation
            SET email = $2,
                contact_id = COALESCE(
                    (SELECT id FROM storefront.contact WHERE email = $2),
                    contact_id
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CONVERSATION_COLUMNS}
            "
        ))
        .bind(conversation)
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// All conversations of a visitor, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn visitor_conversations(
        &self,
        visitor: VisitorId,
    ) -> Result<Vec<ConversationSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ConversationRow>(&format!(
            r"
            SELECT {CONVERSATION_COLUMNS}
            FROM storefront.conversation
            WHERE visitor_id = $1
            ORDER BY updated_at DESC
            "
        ))
        .bind(visitor)
        .fetch_all(self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let conversation: Conversation = row.try_into()?;
            let last_message = last_message(self.pool, conversation.id).await?;
            let has_open_ticket: bool = sqlx::query_scalar(
                r"
                SELECT EXISTS (
                    SELECT 1 FROM storefront.support_ticket
                    WHERE conversation_id = $1 AND status IN ('pending', 'in_progress')
                )
                ",
            )
            .bind(conversation.id)
            .fetch_one(self.pool)
            .await?;

            summaries.push(ConversationSummary {
                conversation,
                last_message,
                has_open_ticket,
            });
        }
        Ok(summaries)
    }

    /// Archive a conversation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the conversation doesn't exist.
    pub async fn close(&self, id: ConversationId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.conversation
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(ConversationStatus::Archived.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
