//! Staff support desk: ticket queue, replies, and customer emails.
//!
//! Every handler requires [`RequireStaff`].

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use lavistique_core::{Email, TicketId, TicketPriority, TicketStatus};

use crate::db::TicketRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireStaff;
use crate::models::{Message, Page, SupportTicket, TicketDetail, TicketStats, TicketSummary};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct TicketListParams {
    pub status: Option<TicketStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub content: String,
    pub staff_name: Option<String>,
}

/// Reply outcome. `emailed` is false when no email went out.
#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub ticket: SupportTicket,
    pub message: Message,
    pub emailed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub staff_name: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct PriorityRequest {
    pub priority: TicketPriority,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewReadyRequest {
    pub email: String,
    pub customer_name: String,
    pub preview_url: String,
    pub order_id: String,
}

fn required(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(AppError::BadRequest(format!("{what} required")))
    } else {
        Ok(())
    }
}

/// `GET /api/admin/support/tickets`
pub async fn tickets(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Query(params): Query<TicketListParams>,
) -> Result<Json<Page<TicketSummary>>> {
    Ok(Json(
        TicketRepository::new(state.pool())
            .list(params.status, params.limit, params.offset)
            .await?,
    ))
}

/// `GET /api/admin/support/tickets/pending`
pub async fn pending(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<TicketSummary>>> {
    Ok(Json(
        TicketRepository::new(state.pool())
            .pending(params.limit)
            .await?,
    ))
}

/// `GET /api/admin/support/count`
pub async fn pending_count(
    _staff: RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Value>> {
    let count = TicketRepository::new(state.pool()).pending_count().await?;
    Ok(Json(json!({ "count": count })))
}

/// `GET /api/admin/support/stats`
pub async fn stats(
    _staff: RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<TicketStats>> {
    Ok(Json(TicketRepository::new(state.pool()).stats().await?))
}

/// `GET /api/admin/support/tickets/{id}`
pub async fn ticket(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
) -> Result<Json<TicketDetail>> {
    TicketRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))
}

/// `GET /api/admin/support/tickets/{id}/messages`
pub async fn messages(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
) -> Result<Json<Vec<Message>>> {
    Ok(Json(
        TicketRepository::new(state.pool())
            .conversation_messages(id)
            .await?,
    ))
}

/// `POST /api/admin/support/tickets/{id}/reply`
///
/// Posts a staff message to the conversation and emails the customer. A
/// failed or skipped email never fails the reply.
#[instrument(skip(state, request))]
pub async fn reply(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(request): Json<ReplyRequest>,
) -> Result<Json<ReplyResponse>> {
    required(&request.content, "Reply content")?;

    let (ticket, message) = TicketRepository::new(state.pool())
        .reply(id, &request.content, request.staff_name.as_deref())
        .await?;
    add_breadcrumb("support", "Staff reply", &[("ticket_id", &id.to_string())]);

    let emailed = notify_customer(&state, &ticket, &request.content).await;
    Ok(Json(ReplyResponse {
        ticket,
        message,
        emailed,
    }))
}

/// Email a staff reply to the ticket's customer. Returns whether it was sent.
async fn notify_customer(state: &AppState, ticket: &SupportTicket, reply: &str) -> bool {
    let Some(mailer) = state.email() else {
        tracing::info!(ticket_id = %ticket.id, "Email not configured, skipping reply email");
        return false;
    };
    let email = match Email::parse(&ticket.customer_email) {
        Ok(email) => email,
        Err(e) => {
            tracing::warn!(ticket_id = %ticket.id, error = %e, "Ticket has no usable email");
            return false;
        }
    };

    match mailer
        .send_support_reply(&email, &ticket.subject, reply, ticket.conversation_id)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(
                ticket_id = %ticket.id,
                error = %e,
                "Failed to send support reply email"
            );
            false
        }
    }
}

/// `POST /api/admin/support/tickets/{id}/resolve`
pub async fn resolve(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
) -> Result<Json<SupportTicket>> {
    Ok(Json(TicketRepository::new(state.pool()).resolve(id).await?))
}

/// `POST /api/admin/support/tickets/{id}/assign`
pub async fn assign(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<SupportTicket>> {
    required(&request.staff_name, "Staff name")?;
    Ok(Json(
        TicketRepository::new(state.pool())
            .assign(id, request.staff_name.trim())
            .await?,
    ))
}

/// `POST /api/admin/support/tickets/{id}/notes`
pub async fn add_note(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(request): Json<NoteRequest>,
) -> Result<Json<SupportTicket>> {
    required(&request.note, "Note")?;
    Ok(Json(
        TicketRepository::new(state.pool())
            .add_internal_note(id, request.note.trim())
            .await?,
    ))
}

/// `POST /api/admin/support/tickets/{id}/priority`
pub async fn set_priority(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(request): Json<PriorityRequest>,
) -> Result<Json<SupportTicket>> {
    Ok(Json(
        TicketRepository::new(state.pool())
            .set_priority(id, request.priority)
            .await?,
    ))
}

/// `POST /api/admin/support/tickets/{id}/status`
pub async fn set_status(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<SupportTicket>> {
    Ok(Json(
        TicketRepository::new(state.pool())
            .update_status(id, request.status)
            .await?,
    ))
}

/// `POST /api/admin/emails/preview-ready`
///
/// Unlike ticket replies this is an explicit staff action, so a missing
/// email configuration or a failed send is reported.
#[instrument(skip(state, request), fields(order_id = %request.order_id))]
pub async fn send_preview_ready(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Json(request): Json<PreviewReadyRequest>,
) -> Result<Json<Value>> {
    let email = Email::parse(&request.email)
        .map_err(|_| AppError::BadRequest("Invalid email address".to_string()))?;
    required(&request.preview_url, "Preview URL")?;
    required(&request.order_id, "Order ID")?;

    let mailer = state
        .email()
        .ok_or_else(|| AppError::BadRequest("Email is not configured".to_string()))?;
    let receipt = mailer
        .send_preview_ready(
            &email,
            request.customer_name.trim(),
            request.preview_url.trim(),
            request.order_id.trim(),
        )
        .await?;

    Ok(Json(json!({ "success": true, "id": receipt.id })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert!(required("hello", "Note").is_ok());
        let err = required("  ", "Note").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Note required"));
    }

    #[test]
    fn test_status_request_uses_snake_case() {
        let request: StatusRequest = serde_json::from_str(r#"{"status": "in_progress"}"#).unwrap();
        assert_eq!(request.status, TicketStatus::InProgress);
        let request: PriorityRequest = serde_json::from_str(r#"{"priority": "urgent"}"#).unwrap();
        assert_eq!(request.priority, TicketPriority::Urgent);
    }
}
