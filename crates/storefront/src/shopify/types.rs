//! Domain types for the Shopify Storefront API.
//!
//! These types provide a clean, ergonomic API separate from the wire shapes
//! (edges, nodes, fragments) the API returns. Connections are flattened into
//! plain vectors.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use lavistique_core::cart::is_skip_the_line;
use lavistique_core::{CurrencyCode, format_price};

// =============================================================================
// Money Types
// =============================================================================

/// Monetary amount with currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl Money {
    /// Localized display string (`€ 59,99`). Unknown currencies fall back to
    /// `59.99 XYZ`.
    #[must_use]
    pub fn display(&self) -> String {
        self.currency_code.parse::<CurrencyCode>().map_or_else(
            |_| format!("{:.2} {}", self.amount, self.currency_code),
            |currency| format_price(self.amount, currency),
        )
    }
}

/// Price range for a product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min_variant_price: Money,
    pub max_variant_price: Money,
}

// =============================================================================
// Image & SEO Types
// =============================================================================

/// Product or collection image.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: Option<String>,
    pub url: String,
    pub alt_text: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

/// SEO metadata.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Seo {
    pub title: Option<String>,
    pub description: Option<String>,
}

// =============================================================================
// Product Types
// =============================================================================

/// A selected option on a variant (e.g., Size: Large).
#[derive(Debug, Clone, Serialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

/// Product option definition (e.g., Size with values S, M, L).
#[derive(Debug, Clone, Serialize)]
pub struct ProductOption {
    pub id: String,
    pub name: String,
    pub values: Vec<String>,
}

/// A purchasable product variant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    pub available_for_sale: bool,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub selected_options: Vec<SelectedOption>,
    pub image: Option<Image>,
    pub sku: Option<String>,
}

/// Reference to a collection a product belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionRef {
    pub id: String,
    pub handle: String,
    pub title: String,
}

/// Product card data used by grids and search results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub available_for_sale: bool,
    pub featured_image: Option<Image>,
    pub price_range: PriceRange,
    pub compare_at_price_range: Option<PriceRange>,
    /// IDs of the collections the product is in (for discount targeting).
    pub collection_ids: Vec<String>,
}

/// Full product detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub description_html: String,
    pub available_for_sale: bool,
    pub featured_image: Option<Image>,
    pub images: Vec<Image>,
    pub options: Vec<ProductOption>,
    pub variants: Vec<ProductVariant>,
    pub price_range: PriceRange,
    pub compare_at_price_range: Option<PriceRange>,
    pub collections: Vec<CollectionRef>,
    pub seo: Seo,
    pub tags: Vec<String>,
    pub vendor: String,
    pub product_type: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Product {
    /// IDs of the collections this product belongs to.
    #[must_use]
    pub fn collection_ids(&self) -> Vec<String> {
        self.collections.iter().map(|c| c.id.clone()).collect()
    }
}

// =============================================================================
// Collection Types
// =============================================================================

/// Collection card data.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub image: Option<Image>,
}

/// Full collection with its first page of products.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub description_html: String,
    pub image: Option<Image>,
    pub seo: Seo,
    pub updated_at: Option<String>,
    pub products: Vec<ProductSummary>,
    pub page_info: PageInfo,
}

// =============================================================================
// Pagination Types
// =============================================================================

/// Cursor pagination info.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// One page of products.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConnection {
    pub products: Vec<ProductSummary>,
    pub page_info: PageInfo,
}

/// One page of collections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionConnection {
    pub collections: Vec<CollectionSummary>,
    pub page_info: PageInfo,
}

// =============================================================================
// Cart Types
// =============================================================================

/// Key/value attribute on a cart or cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: Option<String>,
}

/// Product data nested in a cart line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub featured_image: Option<Image>,
}

/// The variant a cart line refers to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMerchandise {
    pub id: String,
    pub title: String,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub selected_options: Vec<SelectedOption>,
    pub image: Option<Image>,
    pub product: CartProduct,
}

/// A line in the cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: String,
    pub quantity: i64,
    pub merchandise: CartMerchandise,
    pub attributes: Vec<Attribute>,
    pub total_amount: Money,
    pub compare_at_amount_per_quantity: Option<Money>,
}

impl CartLine {
    /// Value of a line attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .and_then(|a| a.value.as_deref())
    }
}

/// Cart totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartCost {
    pub subtotal: Money,
    pub total: Money,
    pub total_tax: Option<Money>,
}

/// Discount code applied to a cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartDiscountCode {
    pub code: String,
    pub applicable: bool,
}

/// Discount amount applied at cart level.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartDiscountAllocation {
    pub discounted_amount: Money,
    /// Set for automatic discounts.
    pub title: Option<String>,
    /// Set for code discounts.
    pub code: Option<String>,
}

/// Buyer identity attached to a cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartBuyerIdentity {
    pub email: Option<String>,
    pub country_code: Option<String>,
}

/// Shopping cart.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub checkout_url: String,
    pub total_quantity: i64,
    pub lines: Vec<CartLine>,
    pub cost: CartCost,
    pub discount_codes: Vec<CartDiscountCode>,
    pub discount_allocations: Vec<CartDiscountAllocation>,
    pub buyer_identity: Option<CartBuyerIdentity>,
    pub attributes: Vec<Attribute>,
    pub note: Option<String>,
}

impl Cart {
    /// Whether the Skip the Line upsell is already in the cart.
    #[must_use]
    pub fn has_skip_the_line(&self) -> bool {
        self.lines.iter().any(|line| {
            is_skip_the_line(
                &line.merchandise.product.title,
                &line.merchandise.product.handle,
            )
        })
    }

    /// Whether a discount code is already applied (case-insensitive).
    #[must_use]
    pub fn has_discount_code(&self, code: &str) -> bool {
        self.discount_codes
            .iter()
            .any(|c| c.code.eq_ignore_ascii_case(code))
    }
}

// =============================================================================
// Cart Inputs
// =============================================================================

/// Attribute to set on a cart or line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInput {
    pub key: String,
    pub value: String,
}

/// Line to add to a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    pub merchandise_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub attributes: Vec<AttributeInput>,
}

const fn default_quantity() -> i64 {
    1
}

/// Quantity (and optionally attribute) change for an existing line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineUpdateInput {
    pub id: String,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeInput>>,
}

/// Buyer identity to set on a cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyerIdentityInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

/// Input for creating a cart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartInput {
    #[serde(default)]
    pub lines: Vec<CartLineInput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discount_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_identity: Option<BuyerIdentityInput>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(amount: &str, currency: &str) -> Money {
        Money {
            amount: Decimal::from_str(amount).unwrap(),
            currency_code: currency.to_string(),
        }
    }

    #[test]
    fn test_money_display_known_currency() {
        assert_eq!(money("59.99", "USD").display(), "$59.99");
    }

    #[test]
    fn test_money_display_unknown_currency() {
        assert_eq!(money("10", "JPY").display(), "10.00 JPY");
    }

    #[test]
    fn test_cart_input_serializes_for_graphql() {
        let input = CartInput {
            lines: vec![CartLineInput {
                merchandise_id: "gid://shopify/ProductVariant/1".to_string(),
                quantity: 2,
                attributes: vec![],
            }],
            discount_codes: vec!["WELCOME10".to_string()],
            ..CartInput::default()
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["lines"][0]["merchandiseId"], "gid://shopify/ProductVariant/1");
        assert_eq!(json["discountCodes"][0], "WELCOME10");
        assert!(json.get("note").is_none());
        assert!(json.get("buyerIdentity").is_none());
    }

    #[test]
    fn test_line_input_defaults_quantity() {
        let line: CartLineInput =
            serde_json::from_str(r#"{"merchandiseId":"gid://shopify/ProductVariant/1"}"#).unwrap();
        assert_eq!(line.quantity, 1);
        assert!(line.attributes.is_empty());
    }
}
