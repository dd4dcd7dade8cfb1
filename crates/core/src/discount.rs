//! Promo code rules and the discount calculator.
//!
//! Rules are mirrored from the commerce platform's discount admin and stored
//! locally so product pages can show a struck-through price for the active
//! promo code without a round trip to the platform.
//!
//! All money in this module is in integer cents.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::{DiscountKind, DiscountRuleId, DiscountScope};

/// Shown when a code is unknown, inactive, not started, or used up.
pub const INVALID_PROMO_MESSAGE: &str = "Invalid or expired promo code";

/// Shown when a known code is past its end date.
pub const EXPIRED_PROMO_MESSAGE: &str = "This promo code has expired";

/// A promo code definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountRule {
    pub id: DiscountRuleId,
    /// ID of the discount in the commerce platform, when synced from there.
    pub shopify_discount_id: Option<String>,
    /// Uppercase redemption code.
    pub code: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    /// Whole percent for percentage rules, cents for fixed-amount rules.
    pub value: i64,
    #[serde(rename = "appliesTo")]
    pub scope: DiscountScope,
    /// Collection or product IDs the rule is limited to.
    pub target_ids: Option<Vec<String>>,
    /// Human-readable name of the targeted collection/product.
    pub target_name: Option<String>,
    /// Minimum order subtotal in cents.
    pub minimum_purchase: Option<i64>,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Why a rule can or cannot be redeemed right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Inactive,
    NotStarted,
    Expired,
    Exhausted,
}

impl Availability {
    /// Message to show a shopper who tried to use the code.
    #[must_use]
    pub const fn message(self) -> Option<&'static str> {
        match self {
            Self::Available => None,
            Self::Expired => Some(EXPIRED_PROMO_MESSAGE),
            Self::Inactive | Self::NotStarted | Self::Exhausted => Some(INVALID_PROMO_MESSAGE),
        }
    }
}

impl DiscountRule {
    /// Check the active flag, date window, and usage cap at `now`.
    #[must_use]
    pub fn availability(&self, now: DateTime<Utc>) -> Availability {
        if !self.is_active {
            return Availability::Inactive;
        }
        if self.starts_at.is_some_and(|start| now < start) {
            return Availability::NotStarted;
        }
        if self.ends_at.is_some_and(|end| now > end) {
            return Availability::Expired;
        }
        if self
            .usage_limit
            .is_some_and(|limit| self.usage_count >= limit)
        {
            return Availability::Exhausted;
        }
        Availability::Available
    }

    /// Whether the rule can be redeemed at `now`.
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.availability(now) == Availability::Available
    }

    /// Whether a product falls inside the rule's scope.
    ///
    /// Targets and candidates may each be numeric IDs or global IDs
    /// (`gid://shopify/Product/123`); both forms of the same ID match.
    #[must_use]
    pub fn qualifies(&self, product_id: &str, collection_ids: &[String]) -> bool {
        let targets = self.target_ids.as_deref().unwrap_or_default();
        let targeted = |id: &str| targets.iter().any(|t| same_id(t, id));
        match self.scope {
            DiscountScope::All => true,
            DiscountScope::Collection => collection_ids.iter().any(|c| targeted(c)),
            DiscountScope::Product => targeted(product_id),
        }
    }
}

/// Compare two resource IDs by their last path segment.
fn same_id(a: &str, b: &str) -> bool {
    let tail = |id: &str| {
        let id = id.trim();
        id.rsplit('/').next().unwrap_or(id).to_owned()
    };
    let (a, b) = (tail(a), tail(b));
    !a.is_empty() && a == b
}

/// Normalize a shopper-entered code for storage and lookup.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Outcome of applying a rule to a single price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCalculation {
    pub original: i64,
    pub discounted: i64,
    pub savings: i64,
    /// Effective discount as a whole percent.
    pub percentage: i64,
    pub qualifies: bool,
}

impl DiscountCalculation {
    /// Result for a price that gets no discount.
    #[must_use]
    pub const fn none(price: i64) -> Self {
        Self {
            original: price,
            discounted: price,
            savings: 0,
            percentage: 0,
            qualifies: false,
        }
    }
}

/// Apply `rule` to `price` (cents) for a product in `collection_ids`.
///
/// Redeemability (dates, usage) is not checked here; callers look the rule up
/// through a path that already filters on it.
#[must_use]
pub fn calculate_discount(
    rule: Option<&DiscountRule>,
    price: i64,
    product_id: &str,
    collection_ids: &[String],
) -> DiscountCalculation {
    let Some(rule) = rule else {
        return DiscountCalculation::none(price);
    };
    if !rule.qualifies(product_id, collection_ids) {
        return DiscountCalculation::none(price);
    }

    let (discounted, percentage) = match rule.kind {
        DiscountKind::Percentage => {
            let percent = rule.value.clamp(0, 100);
            let discounted = round_to_i64(
                Decimal::from(price) * Decimal::from(100 - percent) / Decimal::ONE_HUNDRED,
            );
            (discounted, rule.value)
        }
        DiscountKind::FixedAmount => {
            let discounted = (price - rule.value.max(0)).max(0);
            let percentage = if price > 0 {
                round_to_i64(
                    Decimal::from(price - discounted) * Decimal::ONE_HUNDRED
                        / Decimal::from(price),
                )
            } else {
                0
            };
            (discounted, percentage)
        }
    };

    DiscountCalculation {
        original: price,
        discounted,
        savings: price - discounted,
        percentage,
        qualifies: true,
    }
}

/// Apply a percentage to a unit price for display (two decimals).
#[must_use]
pub fn apply_percentage(price: Decimal, percent: i64) -> Decimal {
    let factor = Decimal::ONE - Decimal::from(percent.clamp(0, 100)) / Decimal::ONE_HUNDRED;
    (price * factor).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn round_to_i64(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or_default()
}
