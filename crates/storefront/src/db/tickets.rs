//! Database operations for support tickets.

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use lavistique_core::{
    ConversationId, Email, MessageId, MessageRole, TicketId, TicketPriority, TicketStatus,
};

use super::conversations::{
    CONVERSATION_COLUMNS, ConversationRow, MESSAGE_COLUMNS, MessageRow, last_message,
};
use super::{RepositoryError, parse_column};
use crate::models::ticket::{DEFAULT_STAFF_NAME, DEFAULT_SUBJECT, append_note};
use crate::models::{
    ConversationWithMessages, Message, Page, SupportTicket, TicketCreation, TicketDetail,
    TicketStats, TicketSummary, clamp_limit,
};

pub(super) const TICKET_COLUMNS: &str = "id, conversation_id, customer_email, subject, reason, \
     status, priority, assigned_to, internal_notes, resolved_at, created_at, updated_at";

/// Default size of the staff pending queue.
pub const DEFAULT_PENDING_LIMIT: i64 = 50;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(super) struct TicketRow {
    id: Uuid,
    conversation_id: Uuid,
    customer_email: String,
    subject: String,
    reason: Option<String>,
    status: String,
    priority: String,
    assigned_to: Option<String>,
    internal_notes: Option<String>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for SupportTicket {
    type Error = RepositoryError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TicketId::from_uuid(row.id),
            conversation_id: ConversationId::from_uuid(row.conversation_id),
            customer_email: row.customer_email,
            subject: row.subject,
            reason: row.reason,
            status: parse_column("status", &row.status)?,
            priority: parse_column("priority", &row.priority)?,
            assigned_to: row.assigned_to,
            internal_notes: row.internal_notes,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for support tickets and staff replies.
pub struct TicketRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TicketRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Open a ticket for a conversation.
    ///
    /// If the conversation already has a pending ticket, that one is returned.
    /// Otherwise a new ticket is inserted, the conversation's email is set,
    /// and the conversation is flagged for human review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the conversation doesn't exist.
    #[instrument(skip(self, email, subject, reason), fields(conversation_id = %conversation))]
    pub async fn create_for_conversation(
        &self,
        conversation: ConversationId,
        email: &Email,
        subject: Option<&str>,
        reason: Option<&str>,
    ) -> Result<TicketCreation, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            SELECT {TICKET_COLUMNS}
            FROM storefront.support_ticket
            WHERE conversation_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            "
        ))
        .bind(conversation)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(row) = existing {
            return Ok(TicketCreation {
                ticket: row.try_into()?,
                is_existing: true,
            });
        }

        let flagged = sqlx::query(
            r"
            UPDATE storefront.conversation
            SET email = $2, needs_human_review = TRUE, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(conversation)
        .bind(email.as_str())
        .execute(&mut *tx)
        .await?;
        if flagged.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let subject = subject
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SUBJECT);

        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            INSERT INTO storefront.support_ticket
                (id, conversation_id, customer_email, subject, reason)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(TicketId::new())
        .bind(conversation)
        .bind(email.as_str())
        .bind(subject)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!("Support ticket created");

        Ok(TicketCreation {
            ticket: row.try_into()?,
            is_existing: false,
        })
    }

    /// Fetch a ticket by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, id: TicketId) -> Result<Option<SupportTicket>, RepositoryError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM storefront.support_ticket WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Pending tickets, newest first, each with the last message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn pending(&self, limit: Option<i64>) -> Result<Vec<TicketSummary>, RepositoryError> {
        let limit = limit.unwrap_or(DEFAULT_PENDING_LIMIT).clamp(1, 100);
        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            SELECT {TICKET_COLUMNS}
            FROM storefront.support_ticket
            WHERE status = 'pending'
            ORDER BY created_at DESC
            LIMIT $1
            "
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        self.summarize(rows).await
    }

    /// Tickets, newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        status: Option<TicketStatus>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<TicketSummary>, RepositoryError> {
        let limit = clamp_limit(limit);
        let offset = offset.unwrap_or(0).max(0);
        let status = status.map(TicketStatus::as_str);

        let rows = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            SELECT {TICKET_COLUMNS}
            FROM storefront.support_ticket
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM storefront.support_ticket WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.pool)
        .await?;

        Ok(Page::new(self.summarize(rows).await?, total, offset))
    }

    async fn summarize(&self, rows: Vec<TicketRow>) -> Result<Vec<TicketSummary>, RepositoryError> {
        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let ticket: SupportTicket = row.try_into()?;
            let last_message = last_message(self.pool, ticket.conversation_id).await?;
            summaries.push(TicketSummary {
                ticket,
                last_message,
            });
        }
        Ok(summaries)
    }

    /// Number of tickets waiting for a first response.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending_count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM storefront.support_ticket WHERE status = 'pending'",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }

    /// Ticket with its full conversation (messages oldest first).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: TicketId) -> Result<Option<TicketDetail>, RepositoryError> {
        let Some(ticket) = self.find(id).await? else {
            return Ok(None);
        };

        let conversation = sqlx::query_as::<_, ConversationRow>(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM storefront.conversation WHERE id = $1"
        ))
        .bind(ticket.conversation_id)
        .fetch_optional(self.pool)
        .await?;

        let conversation = match conversation {
            Some(row) => Some(ConversationWithMessages {
                conversation: row.try_into()?,
                messages: self.conversation_messages(id).await?,
            }),
            None => None,
        };

        Ok(Some(TicketDetail {
            ticket,
            conversation,
        }))
    }

    /// All messages of the ticket's conversation, oldest first.
    ///
    /// Returns an empty list when the ticket doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn conversation_messages(
        &self,
        id: TicketId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query_as::<_, MessageRow>(&format!(
            r"
            SELECT m.{}
            FROM storefront.message m
            JOIN storefront.support_ticket t ON t.conversation_id = m.conversation_id
            WHERE t.id = $1
            ORDER BY m.created_at ASC
            ",
            MESSAGE_COLUMNS.replace(", ", ", m.")
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Post a staff reply into the ticket's conversation.
    ///
    /// A pending ticket moves to `in_progress`. Returns the ticket (after the
    /// status change) and the new message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket doesn't exist.
    #[instrument(skip(self, content), fields(ticket_id = %id))]
    pub async fn reply(
        &self,
        id: TicketId,
        content: &str,
        staff_name: Option<&str>,
    ) -> Result<(SupportTicket, Message), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let ticket: SupportTicket = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            UPDATE storefront.support_ticket
            SET status = CASE WHEN status = 'pending' THEN 'in_progress' ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?
        .try_into()?;

        let metadata = json!({
            "staffName": staff_name.unwrap_or(DEFAULT_STAFF_NAME),
            "ticketId": id,
        });

        let message: Message = sqlx::query_as::<_, MessageRow>(&format!(
            r"
            INSERT INTO storefront.message (id, conversation_id, role, content, metadata)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(MessageId::new())
        .bind(ticket.conversation_id)
        .bind(MessageRole::Staff.as_str())
        .bind(content)
        .bind(&metadata)
        .fetch_one(&mut *tx)
        .await?
        .try_into()?;

        sqlx::query("UPDATE storefront.conversation SET updated_at = NOW() WHERE id = $1")
            .bind(ticket.conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((ticket, message))
    }

    /// Set a ticket's status; resolved and closed stamp `resolved_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket doesn't exist.
    pub async fn update_status(
        &self,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<SupportTicket, RepositoryError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            UPDATE storefront.support_ticket
            SET status = $2,
                resolved_at = CASE WHEN $3 THEN NOW() ELSE resolved_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(status.is_terminal())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Mark a ticket resolved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket doesn't exist.
    pub async fn resolve(&self, id: TicketId) -> Result<SupportTicket, RepositoryError> {
        self.update_status(id, TicketStatus::Resolved).await
    }

    /// Assign a ticket to a staff member and move it to `in_progress`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket doesn't exist.
    pub async fn assign(
        &self,
        id: TicketId,
        staff: &str,
    ) -> Result<SupportTicket, RepositoryError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            UPDATE storefront.support_ticket
            SET assigned_to = $2, status = 'in_progress', updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(id)
        .bind(staff)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Append a timestamped internal note.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket doesn't exist.
    pub async fn add_internal_note(
        &self,
        id: TicketId,
        note: &str,
    ) -> Result<SupportTicket, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<Option<String>> = sqlx::query_scalar(
            "SELECT internal_notes FROM storefront.support_ticket WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let existing = existing.ok_or(RepositoryError::NotFound)?;

        let notes = append_note(existing.as_deref(), note, Utc::now());

        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            UPDATE storefront.support_ticket
            SET internal_notes = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(id)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        row.try_into()
    }

    /// Change a ticket's priority.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the ticket doesn't exist.
    pub async fn set_priority(
        &self,
        id: TicketId,
        priority: TicketPriority,
    ) -> Result<SupportTicket, RepositoryError> {
        let row = sqlx::query_as::<_, TicketRow>(&format!(
            r"
            UPDATE storefront.support_ticket
            SET priority = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TICKET_COLUMNS}
            "
        ))
        .bind(id)
        .bind(priority.as_str())
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.try_into()
    }

    /// Ticket counts per status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn stats(&self) -> Result<TicketStats, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM storefront.support_ticket GROUP BY status",
        )
        .fetch_all(self.pool)
        .await?;

        let counts = rows
            .into_iter()
            .map(|(status, count)| Ok((parse_column("status", &status)?, count)))
            .collect::<Result<Vec<(TicketStatus, i64)>, RepositoryError>>()?;

        Ok(TicketStats::from_counts(counts))
    }
}
