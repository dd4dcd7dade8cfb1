//! Portrait configurator API.
//!
//! The configurator state lives in the session under `keys::WIZARD` and is
//! returned whole after every change, so the client only renders it.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use lavistique_core::wizard::{TOTAL_STEPS, WizardProduct, WizardState, WizardStep};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{ActivePromo, RequestLocale};
use crate::models::keys;
use crate::routes::cart::add_lines_to_session_cart;
use crate::shopify::types::{AttributeInput, Cart, CartLineInput, Product};
use crate::state::AppState;

/// Wizard state plus the navigation flags the UI needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
    #[serde(flatten)]
    pub state: WizardState,
    pub step_number: usize,
    pub total_steps: usize,
    pub can_go_next: bool,
    pub can_go_previous: bool,
}

impl From<WizardState> for WizardView {
    fn from(state: WizardState) -> Self {
        Self {
            step_number: state.current_step.number(),
            total_steps: TOTAL_STEPS,
            can_go_next: state.can_go_next(),
            can_go_previous: state.can_go_previous(),
            state,
        }
    }
}

async fn load(session: &Session) -> Result<WizardState> {
    Ok(session
        .get::<WizardState>(keys::WIZARD)
        .await
        .map_err(|e| AppError::Internal(format!("Session read failed: {e}")))?
        .unwrap_or_default())
}

async fn save(session: &Session, state: WizardState) -> Result<Json<WizardView>> {
    session
        .insert(keys::WIZARD, &state)
        .await
        .map_err(|e| AppError::Internal(format!("Session write failed: {e}")))?;
    Ok(Json(state.into()))
}

/// Configurable product from a Shopify product: the first available variant
/// is the one added to the cart.
fn wizard_product(product: &Product) -> Result<WizardProduct> {
    let variant = product
        .variants
        .iter()
        .find(|v| v.available_for_sale)
        .or_else(|| product.variants.first())
        .ok_or_else(|| AppError::BadRequest("Product has no variants".to_string()))?;

    Ok(WizardProduct {
        id: variant.id.clone(),
        handle: product.handle.clone(),
        title: product.title.clone(),
        base_price: product.price_range.min_variant_price.amount,
    })
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    pub handle: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostumeRequest {
    pub costume_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeRequest {
    pub size_id: String,
}

/// `frameId: null` removes the frame.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    pub frame_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoRequest {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct GoToRequest {
    pub step: WizardStep,
}

/// Cart and the (reset) wizard after adding the portrait.
#[derive(Debug, Serialize)]
pub struct AddToCartResponse {
    pub cart: Cart,
    pub wizard: WizardView,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/wizard`
pub async fn show(session: Session) -> Result<Json<WizardView>> {
    Ok(Json(load(&session).await?.into()))
}

/// `POST /api/wizard/product`
///
/// Starts configuring a product. Earlier choices are discarded when the
/// product changes.
#[instrument(skip(state, session))]
pub async fn set_product(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    Json(request): Json<ProductRequest>,
) -> Result<Json<WizardView>> {
    let product = state
        .storefront()
        .get_product_by_handle(&request.handle, locale.locale())
        .await?;
    let product = wizard_product(&product)?;

    let mut wizard = load(&session).await?;
    if wizard.product.as_ref().is_some_and(|p| p.handle != product.handle) {
        wizard.reset();
    }
    wizard.set_product(product);

    save(&session, wizard).await
}

/// `POST /api/wizard/costume`
pub async fn select_costume(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CostumeRequest>,
) -> Result<Json<WizardView>> {
    let costume = state
        .wizard_options()
        .costume(&request.costume_id)
        .cloned()
        .ok_or_else(|| AppError::BadRequest(format!("Unknown costume: {}", request.costume_id)))?;

    let mut wizard = load(&session).await?;
    wizard.select_costume(costume);
    save(&session, wizard).await
}

/// `POST /api/wizard/size`
pub async fn select_size(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<SizeRequest>,
) -> Result<Json<WizardView>> {
    let size = state
        .wizard_options()
        .size(&request.size_id)
        .cloned()
        .ok_or_else(|| AppError::BadRequest(format!("Unknown size: {}", request.size_id)))?;

    let mut wizard = load(&session).await?;
    wizard.select_size(size);
    save(&session, wizard).await
}

/// `POST /api/wizard/frame`
pub async fn select_frame(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<FrameRequest>,
) -> Result<Json<WizardView>> {
    let frame = match request.frame_id.as_deref() {
        None | Some("" | "none") => None,
        Some(id) => Some(
            state
                .wizard_options()
                .frame(id)
                .cloned()
                .ok_or_else(|| AppError::BadRequest(format!("Unknown frame: {id}")))?,
        ),
    };

    let mut wizard = load(&session).await?;
    wizard.select_frame(frame);
    save(&session, wizard).await
}

/// `POST /api/wizard/photo`
///
/// Records a photo already uploaded elsewhere; only its URL is stored.
pub async fn set_photo(
    session: Session,
    Json(request): Json<PhotoRequest>,
) -> Result<Json<WizardView>> {
    let url = request.url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(AppError::BadRequest("Photo URL must be http(s)".to_string()));
    }

    let mut wizard = load(&session).await?;
    wizard.set_uploaded_image(url.to_string(), request.name.trim().to_string());
    save(&session, wizard).await
}

/// `DELETE /api/wizard/photo`
pub async fn clear_photo(session: Session) -> Result<Json<WizardView>> {
    let mut wizard = load(&session).await?;
    wizard.clear_uploaded_image();
    save(&session, wizard).await
}

/// `POST /api/wizard/next`
pub async fn next(session: Session) -> Result<Json<WizardView>> {
    let mut wizard = load(&session).await?;
    if !wizard.can_go_next() {
        return Err(AppError::BadRequest(
            "Complete this step before continuing".to_string(),
        ));
    }
    wizard.next();
    save(&session, wizard).await
}

/// `POST /api/wizard/previous`
pub async fn previous(session: Session) -> Result<Json<WizardView>> {
    let mut wizard = load(&session).await?;
    wizard.previous();
    save(&session, wizard).await
}

/// `POST /api/wizard/go-to`
pub async fn go_to(
    session: Session,
    Json(request): Json<GoToRequest>,
) -> Result<Json<WizardView>> {
    let mut wizard = load(&session).await?;
    wizard.go_to(request.step);
    save(&session, wizard).await
}

/// `POST /api/wizard/reset`
pub async fn reset(session: Session) -> Result<Json<WizardView>> {
    let mut wizard = load(&session).await?;
    wizard.reset();
    save(&session, wizard).await
}

/// `POST /api/wizard/add-to-cart`
///
/// Adds the configured portrait as one line with the customization
/// attributes, then resets the wizard.
#[instrument(skip(state, session))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    locale: RequestLocale,
    ActivePromo(promo): ActivePromo,
) -> Result<Json<AddToCartResponse>> {
    let mut wizard = load(&session).await?;
    let variant_id = wizard
        .variant_id()
        .ok_or_else(|| AppError::BadRequest("Choose a product and size first".to_string()))?
        .to_string();

    let line = CartLineInput {
        merchandise_id: variant_id,
        quantity: 1,
        attributes: wizard
            .cart_attributes()
            .into_iter()
            .map(|a| AttributeInput {
                key: a.key,
                value: a.value,
            })
            .collect(),
    };

    let cart = add_lines_to_session_cart(
        &state,
        &session,
        vec![line],
        promo.as_deref(),
        locale.locale(),
    )
    .await?;
    add_breadcrumb("wizard", "Portrait added to cart", &[("cart_id", cart.id.as_str())]);

    wizard.reset();
    let Json(wizard) = save(&session, wizard).await?;

    Ok(Json(AddToCartResponse { cart, wizard }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_view_flags() {
        let view = WizardView::from(WizardState::default());
        assert_eq!(view.step_number, 1);
        assert_eq!(view.total_steps, 4);
        assert!(!view.can_go_next);
        assert!(!view.can_go_previous);
    }

    #[test]
    fn test_view_serializes_flat() {
        let mut state = WizardState::default();
        state.set_product(WizardProduct {
            id: "gid://shopify/ProductVariant/1".to_string(),
            handle: "custom-pet-portrait".to_string(),
            title: "Custom Pet Portrait".to_string(),
            base_price: Decimal::new(5999, 2),
        });
        state.go_to(WizardStep::Photo);

        let json = serde_json::to_value(WizardView::from(state)).unwrap();
        assert_eq!(json["currentStep"], "photo");
        assert_eq!(json["stepNumber"], 3);
        assert_eq!(json["product"]["handle"], "custom-pet-portrait");
        assert_eq!(json["canGoPrevious"], true);
    }

    #[test]
    fn test_frame_request_accepts_null() {
        let request: FrameRequest = serde_json::from_str(r#"{"frameId": null}"#).unwrap();
        assert!(request.frame_id.is_none());
        let request: FrameRequest = serde_json::from_str(r#"{"frameId": "gold"}"#).unwrap();
        assert_eq!(request.frame_id.as_deref(), Some("gold"));
    }

    #[test]
    fn test_go_to_request_step_names() {
        let request: GoToRequest = serde_json::from_str(r#"{"step": "size-frame"}"#).unwrap();
        assert_eq!(request.step, WizardStep::SizeFrame);
    }
}
