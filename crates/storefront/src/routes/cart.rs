//! Cart API handlers.
//!
//! The Shopify cart ID is kept in the session. A cart is created lazily the
//! first time lines are added, carrying the shopper's active promo code.

use axum::{Json, extract::State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use lavistique_core::cart::SKIP_THE_LINE_VARIANT_ID;
use lavistique_core::discount::normalize_code;
use lavistique_core::Locale;

use crate::db::{DiscountRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{ActivePromo, RequestLocale};
use crate::models::keys;
use crate::shopify::types::{
    AttributeInput, BuyerIdentityInput, Cart, CartInput, CartLineInput, CartLineUpdateInput,
};
use crate::state::AppState;

// =============================================================================
// Session Helpers
// =============================================================================

/// Cart ID stored in the session, if any.
pub(crate) async fn session_cart_id(session: &Session) -> Result<Option<String>> {
    session
        .get::<String>(keys::CART_ID)
        .await
        .map_err(|e| AppError::Internal(format!("Session read failed: {e}")))
}

/// Remember a cart for this session.
pub(crate) async fn store_cart_id(session: &Session, cart_id: &str) -> Result<()> {
    session
        .insert(keys::CART_ID, cart_id)
        .await
        .map_err(|e| AppError::Internal(format!("Session write failed: {e}")))
}

/// Cart ID stored in the session, or `NotFound`.
async fn require_cart_id(session: &Session) -> Result<String> {
    session_cart_id(session)
        .await?
        .ok_or_else(|| AppError::NotFound("No cart".to_string()))
}

/// Discount codes for a new cart: the requested ones plus the active promo.
fn with_promo(mut codes: Vec<String>, promo: Option<&str>) -> Vec<String> {
    codes = codes.iter().map(|c| normalize_code(c)).collect();
    if let Some(promo) = promo {
        let promo = normalize_code(promo);
        if !promo.is_empty() && !codes.contains(&promo) {
            codes.push(promo);
        }
    }
    codes.retain(|c| !c.is_empty());
    codes
}

/// Create a cart for this session and remember its ID.
pub(crate) async fn create_session_cart(
    state: &AppState,
    session: &Session,
    mut input: CartInput,
    promo: Option<&str>,
    locale: Locale,
) -> Result<Cart> {
    input.discount_codes = with_promo(input.discount_codes, promo);
    if input.buyer_identity.is_none() {
        input.buyer_identity = Some(BuyerIdentityInput {
            email: None,
            country_code: Some(locale.country.as_str().to_string()),
        });
    }

    let cart = state.storefront().create_cart(input, locale).await?;
    store_cart_id(session, &cart.id).await?;
    tracing::info!(cart_id = %cart.id, "Cart created");

    Ok(cart)
}

/// Add lines to the session cart, creating it when there is none.
pub(crate) async fn add_lines_to_session_cart(
    state: &AppState,
    session: &Session,
    lines: Vec<CartLineInput>,
    promo: Option<&str>,
    locale: Locale,
) -> Result<Cart> {
    if let Some(cart_id) = session_cart_id(session).await? {
        return Ok(state.storefront().add_lines(&cart_id, lines, locale).await?);
    }

    let input = CartInput {
        lines,
        ..CartInput::default()
    };
    create_session_cart(state, session, input, promo, locale).await
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddLinesRequest {
    pub lines: Vec<CartLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLinesRequest {
    pub lines: Vec<CartLineUpdateInput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveLinesRequest {
    pub line_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCodesRequest {
    pub discount_codes: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NoteRequest {
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct AttributesRequest {
    pub attributes: Vec<AttributeInput>,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/cart`
///
/// Returns `null` when the session has no cart. A cart Shopify no longer
/// knows (completed or expired) is forgotten.
#[instrument(skip(state, session))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
) -> Result<Json<Option<Cart>>> {
    let Some(cart_id) = session_cart_id(&session).await? else {
        return Ok(Json(None));
    };

    let cart = state.storefront().get_cart(&cart_id, locale.locale()).await?;
    if cart.is_none() {
        tracing::info!(%cart_id, "Session cart no longer exists");
        session
            .remove::<String>(keys::CART_ID)
            .await
            .map_err(|e| AppError::Internal(format!("Session write failed: {e}")))?;
    }

    Ok(Json(cart))
}

/// `POST /api/cart`
#[instrument(skip(state, session))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    ActivePromo(promo): ActivePromo,
    Json(input): Json<CartInput>,
) -> Result<Json<Cart>> {
    let cart =
        create_session_cart(&state, &session, input, promo.as_deref(), locale.locale()).await?;
    Ok(Json(cart))
}

/// `POST /api/cart/lines`
#[instrument(skip(state, session))]
pub async fn add_lines(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    ActivePromo(promo): ActivePromo,
    Json(request): Json<AddLinesRequest>,
) -> Result<Json<Cart>> {
    if request.lines.is_empty() {
        return Err(AppError::BadRequest("No lines to add".to_string()));
    }

    let cart = add_lines_to_session_cart(
        &state,
        &session,
        request.lines,
        promo.as_deref(),
        locale.locale(),
    )
    .await?;
    add_breadcrumb("cart", "Lines added", &[("cart_id", cart.id.as_str())]);

    Ok(Json(cart))
}

/// `PATCH /api/cart/lines`
///
/// A quantity of zero removes the line.
#[instrument(skip(state, session))]
pub async fn update_lines(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    Json(request): Json<UpdateLinesRequest>,
) -> Result<Json<Cart>> {
    let cart_id = require_cart_id(&session).await?;
    let cart = state
        .storefront()
        .update_lines(&cart_id, request.lines, locale.locale())
        .await?;
    Ok(Json(cart))
}

/// `DELETE /api/cart/lines`
#[instrument(skip(state, session))]
pub async fn remove_lines(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    Json(request): Json<RemoveLinesRequest>,
) -> Result<Json<Cart>> {
    let cart_id = require_cart_id(&session).await?;
    let cart = state
        .storefront()
        .remove_lines(&cart_id, request.line_ids, locale.locale())
        .await?;
    Ok(Json(cart))
}

/// `PUT /api/cart/discount-codes`
#[instrument(skip(state, session))]
pub async fn update_discount_codes(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    Json(request): Json<DiscountCodesRequest>,
) -> Result<Json<Cart>> {
    let cart_id = require_cart_id(&session).await?;
    let codes = with_promo(request.discount_codes, None);
    let cart = state
        .storefront()
        .update_discount_codes(&cart_id, codes, locale.locale())
        .await?;
    Ok(Json(cart))
}

/// `PUT /api/cart/buyer-identity`
#[instrument(skip(state, session))]
pub async fn update_buyer_identity(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    Json(identity): Json<BuyerIdentityInput>,
) -> Result<Json<Cart>> {
    let cart_id = require_cart_id(&session).await?;
    let cart = state
        .storefront()
        .update_buyer_identity(&cart_id, identity, locale.locale())
        .await?;
    Ok(Json(cart))
}

/// `PUT /api/cart/note`
#[instrument(skip(state, session, request))]
pub async fn update_note(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    Json(request): Json<NoteRequest>,
) -> Result<Json<Cart>> {
    let cart_id = require_cart_id(&session).await?;
    let cart = state
        .storefront()
        .update_note(&cart_id, request.note.trim(), locale.locale())
        .await?;
    Ok(Json(cart))
}

/// `PUT /api/cart/attributes`
#[instrument(skip(state, session, request))]
pub async fn update_attributes(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    Json(request): Json<AttributesRequest>,
) -> Result<Json<Cart>> {
    if request.attributes.iter().any(|a| a.key.trim().is_empty()) {
        return Err(AppError::BadRequest("Attribute key required".to_string()));
    }
    let cart_id = require_cart_id(&session).await?;
    let cart = state
        .storefront()
        .update_attributes(&cart_id, request.attributes, locale.locale())
        .await?;
    Ok(Json(cart))
}

/// `POST /api/cart/promo`
///
/// Applies the remembered promo code. A code already on the cart is left as
/// is. A code Shopify accepts counts as one use of the local rule.
#[instrument(skip(state, session))]
pub async fn apply_promo(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    ActivePromo(promo): ActivePromo,
) -> Result<Json<Cart>> {
    let promo = promo.ok_or_else(|| AppError::BadRequest("No active promo code".to_string()))?;
    let cart_id = require_cart_id(&session).await?;
    let locale = locale.locale();

    let cart = state
        .storefront()
        .get_cart(&cart_id, locale)
        .await?
        .ok_or_else(|| AppError::NotFound("Cart not found".to_string()))?;
    if cart.has_discount_code(&promo) {
        return Ok(Json(cart));
    }

    let existing = cart
        .discount_codes
        .iter()
        .map(|c| c.code.clone())
        .collect::<Vec<_>>();
    let cart = state
        .storefront()
        .update_discount_codes(&cart_id, with_promo(existing, Some(&promo)), locale)
        .await?;
    add_breadcrumb("cart", "Promo applied", &[("code", promo.as_str())]);

    let accepted = cart
        .discount_codes
        .iter()
        .any(|c| c.applicable && c.code.eq_ignore_ascii_case(&promo));
    if accepted {
        match DiscountRepository::new(state.pool())
            .increment_usage(&promo)
            .await
        {
            Ok(()) | Err(RepositoryError::NotFound) => {}
            Err(e) => tracing::warn!(error = %e, code = %promo, "Failed to count promo use"),
        }
    }

    Ok(Json(cart))
}

/// `POST /api/cart/skip-the-line`
///
/// Adds the priority-processing upsell once.
#[instrument(skip(state, session))]
pub async fn add_skip_the_line(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    ActivePromo(promo): ActivePromo,
) -> Result<Json<Cart>> {
    let locale = locale.locale();

    if let Some(cart_id) = session_cart_id(&session).await?
        && let Some(cart) = state.storefront().get_cart(&cart_id, locale).await?
        && cart.has_skip_the_line()
    {
        return Ok(Json(cart));
    }

    let line = CartLineInput {
        merchandise_id: SKIP_THE_LINE_VARIANT_ID.to_string(),
        quantity: 1,
        attributes: Vec::new(),
    };
    let cart =
        add_lines_to_session_cart(&state, &session, vec![line], promo.as_deref(), locale).await?;

    Ok(Json(cart))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_promo_appends_once() {
        let codes = with_promo(vec!["welcome10".to_string()], Some(" summer "));
        assert_eq!(codes, vec!["WELCOME10".to_string(), "SUMMER".to_string()]);

        let codes = with_promo(vec!["SUMMER".to_string()], Some("summer"));
        assert_eq!(codes, vec!["SUMMER".to_string()]);
    }

    #[test]
    fn test_with_promo_drops_blank_codes() {
        let codes = with_promo(vec![" ".to_string()], Some(""));
        assert!(codes.is_empty());
        assert!(with_promo(Vec::new(), None).is_empty());
    }
}
