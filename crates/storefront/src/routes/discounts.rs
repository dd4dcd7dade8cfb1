//! Discount rule lookup, price calculation, and staff management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use lavistique_core::DiscountRuleId;
use lavistique_core::discount::{DiscountCalculation, DiscountRule, calculate_discount};

use crate::db::{DiscountRepository, NewDiscountRule, UpdateDiscountRule};
use crate::error::{AppError, Result};
use crate::middleware::RequireStaff;
use crate::state::AppState;

/// Price calculation request. `price` is in cents.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub price: i64,
    pub product_id: String,
    #[serde(default)]
    pub collection_ids: Vec<String>,
    pub code: Option<String>,
}

/// A rule that can be redeemed right now, if `code` names one.
async fn redeemable(state: &AppState, code: &str) -> Result<Option<DiscountRule>> {
    let now = Utc::now();
    Ok(DiscountRepository::new(state.pool())
        .find_by_code(code)
        .await?
        .filter(|rule| rule.is_redeemable(now)))
}

/// `GET /api/discounts/code/{code}`
///
/// Answers `null` for unknown, inactive, expired, or used-up codes.
#[instrument(skip(state))]
pub async fn by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Option<DiscountRule>>> {
    Ok(Json(redeemable(&state, &code).await?))
}

/// `POST /api/discounts/calculate`
#[instrument(skip(state))]
pub async fn calculate(
    State(state): State<AppState>,
    Json(request): Json<CalculateRequest>,
) -> Result<Json<DiscountCalculation>> {
    if request.price < 0 {
        return Err(AppError::BadRequest("Price must not be negative".to_string()));
    }

    let rule = match request.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => redeemable(&state, code).await?,
        _ => None,
    };

    Ok(Json(calculate_discount(
        rule.as_ref(),
        request.price,
        &request.product_id,
        &request.collection_ids,
    )))
}

// =============================================================================
// Staff
// =============================================================================

/// `GET /api/admin/discounts`
pub async fn list(
    _staff: RequireStaff,
    State(state): State<AppState>,
) -> Result<Json<Vec<DiscountRule>>> {
    Ok(Json(DiscountRepository::new(state.pool()).list_active().await?))
}

/// `POST /api/admin/discounts`
#[instrument(skip(state))]
pub async fn create(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Json(rule): Json<NewDiscountRule>,
) -> Result<(StatusCode, Json<DiscountRule>)> {
    if rule.code.trim().is_empty() {
        return Err(AppError::BadRequest("Code required".to_string()));
    }
    if rule.value < 0 {
        return Err(AppError::BadRequest("Value must not be negative".to_string()));
    }

    let rule = DiscountRepository::new(state.pool()).create(&rule).await?;
    tracing::info!(code = %rule.code, "Discount rule created");
    Ok((StatusCode::CREATED, Json(rule)))
}

/// `PATCH /api/admin/discounts/{id}`
#[instrument(skip(state))]
pub async fn update(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DiscountRuleId>,
    Json(update): Json<UpdateDiscountRule>,
) -> Result<Json<DiscountRule>> {
    if update.value.is_some_and(|v| v < 0) || update.minimum_purchase.is_some_and(|v| v < 0) {
        return Err(AppError::BadRequest("Value must not be negative".to_string()));
    }

    let rule = DiscountRepository::new(state.pool())
        .update(id, &update)
        .await?;
    Ok(Json(rule))
}

/// `DELETE /api/admin/discounts/{id}`
#[instrument(skip(state))]
pub async fn delete(
    _staff: RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DiscountRuleId>,
) -> Result<Json<Value>> {
    DiscountRepository::new(state.pool()).delete(id).await?;
    tracing::info!(%id, "Discount rule deleted");
    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_request_shape() {
        let request: CalculateRequest = serde_json::from_str(
            r#"{"price": 7999, "productId": "gid://shopify/Product/1", "collectionIds": ["c1"], "code": "SAVE20"}"#,
        )
        .unwrap();
        assert_eq!(request.price, 7999);
        assert_eq!(request.collection_ids, vec!["c1".to_string()]);
        assert_eq!(request.code.as_deref(), Some("SAVE20"));

        let request: CalculateRequest =
            serde_json::from_str(r#"{"price": 100, "productId": "p"}"#).unwrap();
        assert!(request.collection_ids.is_empty());
        assert!(request.code.is_none());
    }

    #[test]
    fn test_update_can_retarget_rule() {
        let update: UpdateDiscountRule = serde_json::from_str(
            r#"{"appliesTo": "collection", "targetIds": ["7"], "targetName": "Royal", "minimumPurchase": 5000}"#,
        )
        .unwrap();
        assert_eq!(update.scope, Some(lavistique_core::DiscountScope::Collection));
        assert_eq!(update.target_ids, Some(vec!["7".to_string()]));
        assert_eq!(update.target_name.as_deref(), Some("Royal"));
        assert_eq!(update.minimum_purchase, Some(5000));
        assert!(update.code.is_none());
    }
}
