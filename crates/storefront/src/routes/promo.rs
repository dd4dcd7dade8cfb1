//! Active promo code API.
//!
//! The code a shopper arrived with (`?promo=`) or entered is remembered in
//! the `lvq_promo` cookie and validated against the discount rules.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use lavistique_core::discount::{DiscountRule, INVALID_PROMO_MESSAGE};

use crate::db::DiscountRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::ActivePromo;
use crate::middleware::locale::{
    PROMO_COOKIE, expired_cookie, promo_code, promo_cookie, set_cookie,
};
use crate::state::AppState;

/// The validated promo.
#[derive(Debug, Serialize)]
pub struct PromoResponse {
    pub code: String,
    pub rule: DiscountRule,
}

#[derive(Debug, Deserialize)]
pub struct ApplyPromoRequest {
    pub code: String,
}

/// Look up a redeemable rule, or the shopper-facing reason it is not.
async fn redeemable_rule(state: &AppState, code: &str) -> Result<DiscountRule> {
    let rule = DiscountRepository::new(state.pool())
        .find_by_code(code)
        .await?
        .ok_or_else(|| AppError::BadRequest(INVALID_PROMO_MESSAGE.to_string()))?;

    match rule.availability(Utc::now()).message() {
        Some(message) => Err(AppError::BadRequest(message.to_string())),
        None => Ok(rule),
    }
}

/// `GET /api/promo`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ActivePromo(promo): ActivePromo,
) -> Result<Json<PromoResponse>> {
    let code = promo.ok_or_else(|| AppError::NotFound("No active promo code".to_string()))?;
    let rule = redeemable_rule(&state, &code).await?;
    Ok(Json(PromoResponse { code, rule }))
}

/// `POST /api/promo`
///
/// Validates the code and remembers it for 30 days.
#[instrument(skip(state))]
pub async fn apply(
    State(state): State<AppState>,
    Json(request): Json<ApplyPromoRequest>,
) -> Result<Response> {
    if request.code.trim().is_empty() {
        return Err(AppError::BadRequest("Promo code required".to_string()));
    }
    let code = promo_code(&request.code)
        .ok_or_else(|| AppError::BadRequest(INVALID_PROMO_MESSAGE.to_string()))?;

    let rule = redeemable_rule(&state, &code).await?;
    add_breadcrumb("promo", "Promo applied", &[("code", code.as_str())]);

    let mut response = Json(PromoResponse {
        code: code.clone(),
        rule,
    })
    .into_response();
    if let Some(cookie) = promo_cookie(&code) {
        set_cookie(&mut response, &cookie);
    }
    Ok(response)
}

/// `DELETE /api/promo`
pub async fn clear() -> Response {
    let mut response = Json(json!({ "success": true })).into_response();
    set_cookie(&mut response, &expired_cookie(PROMO_COOKIE));
    response
}
