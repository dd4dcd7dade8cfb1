//! Promo code scenarios.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use lavistique_core::discount::{
    Availability, DiscountRule, EXPIRED_PROMO_MESSAGE, INVALID_PROMO_MESSAGE, apply_percentage,
    calculate_discount, normalize_code,
};
use lavistique_core::{CurrencyCode, DiscountKind, DiscountRuleId, DiscountScope, format_price};

fn rule(kind: DiscountKind, value: i64, scope: DiscountScope, targets: &[&str]) -> DiscountRule {
    let now = Utc::now();
    DiscountRule {
        id: DiscountRuleId::new(),
        shopify_discount_id: None,
        code: "SUMMER20".to_string(),
        title: "Summer sale".to_string(),
        kind,
        value,
        scope,
        target_ids: (!targets.is_empty())
            .then(|| targets.iter().map(ToString::to_string).collect()),
        target_name: None,
        minimum_purchase: None,
        usage_limit: None,
        usage_count: 0,
        starts_at: None,
        ends_at: None,
        is_active: true,
        synced_at: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_percentage_off_everything() {
    let summer = rule(DiscountKind::Percentage, 20, DiscountScope::All, &[]);
    let calc = calculate_discount(Some(&summer), 7999, "gid://shopify/Product/1", &[]);

    assert!(calc.qualifies);
    assert_eq!(calc.discounted, 6399);
    assert_eq!(calc.savings, 1600);
    assert_eq!(calc.percentage, 20);
}

#[test]
fn test_fixed_amount_never_goes_negative() {
    let ten_off = rule(DiscountKind::FixedAmount, 1000, DiscountScope::All, &[]);
    let calc = calculate_discount(Some(&ten_off), 4000, "p", &[]);
    assert_eq!(calc.discounted, 3000);
    assert_eq!(calc.percentage, 25);

    let calc = calculate_discount(Some(&ten_off), 500, "p", &[]);
    assert_eq!(calc.discounted, 0);
    assert_eq!(calc.savings, 500);
    assert_eq!(calc.percentage, 100);
}

#[test]
fn test_collection_scope() {
    let dogs = rule(DiscountKind::Percentage, 15, DiscountScope::Collection, &["dogs"]);

    let in_scope = calculate_discount(Some(&dogs), 10000, "p", &["cats".into(), "dogs".into()]);
    assert!(in_scope.qualifies);
    assert_eq!(in_scope.discounted, 8500);

    let out_of_scope = calculate_discount(Some(&dogs), 10000, "p", &["cats".into()]);
    assert!(!out_of_scope.qualifies);
    assert_eq!(out_of_scope.discounted, 10000);
    assert_eq!(out_of_scope.savings, 0);
}

#[test]
fn test_product_scope() {
    let one = rule(DiscountKind::Percentage, 50, DiscountScope::Product, &["p-1"]);
    assert!(calculate_discount(Some(&one), 2000, "p-1", &[]).qualifies);
    assert!(!calculate_discount(Some(&one), 2000, "p-2", &[]).qualifies);
}

#[test]
fn test_no_rule_means_full_price() {
    let calc = calculate_discount(None, 5999, "p", &[]);
    assert!(!calc.qualifies);
    assert_eq!(calc.discounted, 5999);
}

#[test]
fn test_availability_window_and_usage() {
    let now = Utc::now();
    let mut summer = rule(DiscountKind::Percentage, 20, DiscountScope::All, &[]);
    assert!(summer.is_redeemable(now));

    summer.ends_at = Some(now - Duration::days(1));
    assert_eq!(summer.availability(now), Availability::Expired);
    assert_eq!(summer.availability(now).message(), Some(EXPIRED_PROMO_MESSAGE));

    summer.ends_at = None;
    summer.starts_at = Some(now + Duration::days(1));
    assert_eq!(summer.availability(now), Availability::NotStarted);
    assert_eq!(summer.availability(now).message(), Some(INVALID_PROMO_MESSAGE));

    summer.starts_at = None;
    summer.usage_limit = Some(100);
    summer.usage_count = 100;
    assert_eq!(summer.availability(now), Availability::Exhausted);

    summer.usage_count = 0;
    summer.is_active = false;
    assert!(!summer.is_redeemable(now));
}

#[test]
fn test_shopper_codes_are_normalized() {
    assert_eq!(normalize_code("  summer20 "), "SUMMER20");
}

#[test]
fn test_display_price_after_percentage() {
    let price = apply_percentage(Decimal::new(7999, 2), 20);
    assert_eq!(price, Decimal::new(6399, 2));
    assert_eq!(format_price(price, CurrencyCode::Eur), "€ 63,99");
    assert_eq!(format_price(price, CurrencyCode::Usd), "$63.99");
}
