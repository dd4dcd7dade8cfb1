//! Newsletter subscription and staff CRM handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use lavistique_core::{ContactId, Email, ListId, TagId};

use crate::db::ContactRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireStaff;
use crate::shopify::parse_shopify_id;
use crate::models::{
    Contact, ContactDetail, ContactFilter, ContactUpdate, MailingList, Page, SubscribeResult, Tag,
};
use crate::state::AppState;

fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw)
        .map_err(|_| AppError::BadRequest("Please enter a valid email address".to_string()))
}

/// Blank optional strings count as absent.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub source: Option<String>,
    pub list_id: Option<ListId>,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopifyCustomerRequest {
    pub shopify_customer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NewListRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewTagRequest {
    pub name: String,
    pub color: Option<String>,
}

// =============================================================================
// Public
// =============================================================================

/// `POST /api/contacts/subscribe`
///
/// New subscribers get the welcome email when email is configured. A failed
/// send is logged; the subscription still succeeds.
#[instrument(skip(state, request))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<SubscribeResult>> {
    let email = parse_email(&request.email)?;

    let result = ContactRepository::new(state.pool())
        .subscribe(
            &email,
            non_blank(request.first_name.as_deref()),
            non_blank(request.last_name.as_deref()),
            non_blank(request.source.as_deref()),
            request.list_id,
        )
        .await?;
    add_breadcrumb("contacts", "Newsletter signup", &[]);
    tracing::info!(contact_id = %result.contact_id, is_new = result.is_new, "Subscribed");

    if result.is_new {
        match state.email() {
            Some(mailer) => {
                let code = state
                    .config()
                    .email
                    .as_ref()
                    .and_then(|c| c.welcome_discount_code.as_deref());
                if let Err(e) = mailer.send_welcome(&email, code).await {
                    tracing::error!(
                        error = %e,
                        contact_id = %result.contact_id,
                        "Welcome email failed"
                    );
                }
            }
            None => tracing::info!("Email not configured, skipping welcome email"),
        }
    }

    Ok(Json(result))
}

/// `POST /api/contacts/unsubscribe`
#[instrument(skip(state, request))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<Value>> {
    let email = parse_email(&request.email)?;
    ContactRepository::new(state.pool())
        .unsubscribe(&email)
        .await?;
    Ok(Json(json!({ "success": true })))
}

// =============================================================================
// Staff
// =============================================================================

/// `GET /api/admin/contacts`
pub async fn list(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Query(filter): Query<ContactFilter>,
) -> Result<Json<Page<Contact>>> {
    Ok(Json(ContactRepository::new(state.pool()).list(&filter).await?))
}

/// `GET /api/admin/contacts/by-email?email=`
pub async fn by_email(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<ContactDetail>> {
    let email = parse_email(&query.email)?;
    ContactRepository::new(state.pool())
        .get_by_email(&email)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Contact not found".to_string()))
}

/// `GET /api/admin/contacts/{id}`
pub async fn show(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
) -> Result<Json<ContactDetail>> {
    ContactRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Contact not found".to_string()))
}

/// `PATCH /api/admin/contacts/{id}`
#[instrument(skip(state, update))]
pub async fn update(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    Json(update): Json<ContactUpdate>,
) -> Result<Json<Contact>> {
    Ok(Json(
        ContactRepository::new(state.pool()).update(id, &update).await?,
    ))
}

/// `PUT /api/admin/contacts/{id}/shopify-customer`
///
/// Accepts a numeric ID or a `gid://shopify/Customer/...` GID and stores
/// the numeric part.
#[instrument(skip(state, request))]
pub async fn link_shopify_customer(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<ContactId>,
    Json(request): Json<ShopifyCustomerRequest>,
) -> Result<Json<Value>> {
    let customer_id = parse_shopify_id(request.shopify_customer_id.trim());
    if customer_id.is_empty() {
        return Err(AppError::BadRequest("Shopify customer ID required".to_string()));
    }
    ContactRepository::new(state.pool())
        .link_shopify_customer(id, customer_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/admin/contacts/{id}/lists/{list_id}`
pub async fn add_to_list(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path((id, list_id)): Path<(ContactId, ListId)>,
) -> Result<Json<Value>> {
    ContactRepository::new(state.pool())
        .add_to_list(id, list_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// `DELETE /api/admin/contacts/{id}/lists/{list_id}`
pub async fn remove_from_list(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path((id, list_id)): Path<(ContactId, ListId)>,
) -> Result<Json<Value>> {
    ContactRepository::new(state.pool())
        .remove_from_list(id, list_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// `POST /api/admin/contacts/{id}/tags/{tag_id}`
pub async fn add_tag(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path((id, tag_id)): Path<(ContactId, TagId)>,
) -> Result<Json<Value>> {
    ContactRepository::new(state.pool())
        .add_tag(id, tag_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// `DELETE /api/admin/contacts/{id}/tags/{tag_id}`
pub async fn remove_tag(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path((id, tag_id)): Path<(ContactId, TagId)>,
) -> Result<Json<Value>> {
    ContactRepository::new(state.pool())
        .remove_tag(id, tag_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// `GET /api/admin/lists`
pub async fn lists(
    _staff: RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<MailingList>>> {
    Ok(Json(ContactRepository::new(state.pool()).lists().await?))
}

/// `POST /api/admin/lists`
pub async fn create_list(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Json(request): Json<NewListRequest>,
) -> Result<Json<MailingList>> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("List name required".to_string()));
    }
    Ok(Json(
        ContactRepository::new(state.pool())
            .create_list(name, non_blank(request.description.as_deref()))
            .await?,
    ))
}

/// `GET /api/admin/tags`
pub async fn tags(_staff: RequireStaff, State(state): State<AppState>) -> Result<Json<Vec<Tag>>> {
    Ok(Json(ContactRepository::new(state.pool()).tags().await?))
}

/// `POST /api/admin/tags`
pub async fn create_tag(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Json(request): Json<NewTagRequest>,
) -> Result<Json<Tag>> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Tag name required".to_string()));
    }
    Ok(Json(
        ContactRepository::new(state.pool())
            .create_tag(name, non_blank(request.color.as_deref()))
            .await?,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Ada ")), Some("Ada"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_parse_email_rejects_garbage() {
        assert!(parse_email("not-an-email").is_err());
        assert_eq!(parse_email(" Ada@Example.com ").unwrap().as_str(), "ada@example.com");
    }

    #[test]
    fn test_subscribe_request_shape() {
        let request: SubscribeRequest = serde_json::from_str(
            r#"{"email": "ada@example.com", "firstName": "Ada", "source": "footer"}"#,
        )
        .unwrap();
        assert_eq!(request.first_name.as_deref(), Some("Ada"));
        assert_eq!(request.source.as_deref(), Some("footer"));
        assert!(request.list_id.is_none());
    }
}
