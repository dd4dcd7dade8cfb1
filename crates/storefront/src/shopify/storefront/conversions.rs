//! Wire types for Storefront API responses and their conversion into the
//! domain types.
//!
//! Field names follow the GraphQL schema (camelCase). Connections are read
//! through `nodes` and flattened.

use serde::Deserialize;

use crate::shopify::types::{
    Attribute, Cart, CartBuyerIdentity, CartCost, CartDiscountAllocation, CartDiscountCode,
    CartLine, CartMerchandise, CartProduct, Collection, CollectionConnection, CollectionRef,
    CollectionSummary, Image, Money, PageInfo, PriceRange, Product, ProductConnection,
    ProductOption, ProductSummary, ProductVariant, SelectedOption, Seo,
};

// =============================================================================
// Shared
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct Nodes<T> {
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct NodesWithPageInfo<T> {
    pub nodes: Vec<T>,
    #[serde(rename = "pageInfo")]
    pub page_info: RawPageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

impl From<RawPageInfo> for PageInfo {
    fn from(raw: RawPageInfo) -> Self {
        Self {
            has_next_page: raw.has_next_page,
            end_cursor: raw.end_cursor,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImage {
    pub id: Option<String>,
    pub url: String,
    pub alt_text: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

impl From<RawImage> for Image {
    fn from(raw: RawImage) -> Self {
        Self {
            id: raw.id,
            url: raw.url,
            alt_text: raw.alt_text,
            width: raw.width,
            height: raw.height,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPriceRange {
    pub min_variant_price: Money,
    pub max_variant_price: Money,
}

impl From<RawPriceRange> for PriceRange {
    fn from(raw: RawPriceRange) -> Self {
        Self {
            min_variant_price: raw.min_variant_price,
            max_variant_price: raw.max_variant_price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawSelectedOption {
    pub name: String,
    pub value: String,
}

fn convert_selected_options(raw: Vec<RawSelectedOption>) -> Vec<SelectedOption> {
    raw.into_iter()
        .map(|o| SelectedOption {
            name: o.name,
            value: o.value,
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
pub struct RawSeo {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl From<RawSeo> for Seo {
    fn from(raw: RawSeo) -> Self {
        Self {
            title: raw.title,
            description: raw.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawId {
    pub id: String,
}

// =============================================================================
// Products
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProductCard {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub available_for_sale: bool,
    pub featured_image: Option<RawImage>,
    pub price_range: RawPriceRange,
    pub compare_at_price_range: Option<RawPriceRange>,
    pub collections: Nodes<RawId>,
}

impl From<RawProductCard> for ProductSummary {
    fn from(raw: RawProductCard) -> Self {
        Self {
            id: raw.id,
            handle: raw.handle,
            title: raw.title,
            available_for_sale: raw.available_for_sale,
            featured_image: raw.featured_image.map(Into::into),
            price_range: raw.price_range.into(),
            compare_at_price_range: raw.compare_at_price_range.map(Into::into),
            collection_ids: raw.collections.nodes.into_iter().map(|c| c.id).collect(),
        }
    }
}

fn convert_product_cards(raw: NodesWithPageInfo<RawProductCard>) -> ProductConnection {
    ProductConnection {
        products: raw.nodes.into_iter().map(Into::into).collect(),
        page_info: raw.page_info.into(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductsData {
    pub products: NodesWithPageInfo<RawProductCard>,
}

impl From<ProductsData> for ProductConnection {
    fn from(data: ProductsData) -> Self {
        convert_product_cards(data.products)
    }
}

/// Search returns a union; non-product nodes come back as empty objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawSearchNode {
    Product(Box<RawProductCard>),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
pub struct SearchData {
    pub search: NodesWithPageInfo<RawSearchNode>,
}

impl From<SearchData> for ProductConnection {
    fn from(data: SearchData) -> Self {
        Self {
            products: data
                .search
                .nodes
                .into_iter()
                .filter_map(|node| match node {
                    RawSearchNode::Product(card) => Some((*card).into()),
                    RawSearchNode::Other(_) => None,
                })
                .collect(),
            page_info: data.search.page_info.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawVariant {
    pub id: String,
    pub title: String,
    pub available_for_sale: bool,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub selected_options: Vec<RawSelectedOption>,
    pub image: Option<RawImage>,
    pub sku: Option<String>,
}

impl From<RawVariant> for ProductVariant {
    fn from(raw: RawVariant) -> Self {
        Self {
            id: raw.id,
            title: raw.title,
            available_for_sale: raw.available_for_sale,
            price: raw.price,
            compare_at_price: raw.compare_at_price,
            selected_options: convert_selected_options(raw.selected_options),
            image: raw.image.map(Into::into),
            sku: raw.sku,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RawOptionValue {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProductOption {
    pub id: String,
    pub name: String,
    pub option_values: Vec<RawOptionValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub description_html: String,
    pub available_for_sale: bool,
    pub featured_image: Option<RawImage>,
    pub images: Nodes<RawImage>,
    pub options: Vec<RawProductOption>,
    pub variants: Nodes<RawVariant>,
    pub price_range: RawPriceRange,
    pub compare_at_price_range: Option<RawPriceRange>,
    pub collections: Nodes<RawCollectionRef>,
    #[serde(default)]
    pub seo: RawSeo,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub product_type: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawCollectionRef {
    pub id: String,
    pub handle: String,
    pub title: String,
}

impl From<RawProduct> for Product {
    fn from(raw: RawProduct) -> Self {
        Self {
            id: raw.id,
            handle: raw.handle,
            title: raw.title,
            description: raw.description,
            description_html: raw.description_html,
            available_for_sale: raw.available_for_sale,
            featured_image: raw.featured_image.map(Into::into),
            images: raw.images.nodes.into_iter().map(Into::into).collect(),
            options: raw
                .options
                .into_iter()
                .map(|o| ProductOption {
                    id: o.id,
                    name: o.name,
                    values: o.option_values.into_iter().map(|v| v.name).collect(),
                })
                .collect(),
            variants: raw.variants.nodes.into_iter().map(Into::into).collect(),
            price_range: raw.price_range.into(),
            compare_at_price_range: raw.compare_at_price_range.map(Into::into),
            collections: raw
                .collections
                .nodes
                .into_iter()
                .map(|c| CollectionRef {
                    id: c.id,
                    handle: c.handle,
                    title: c.title,
                })
                .collect(),
            seo: raw.seo.into(),
            tags: raw.tags,
            vendor: raw.vendor,
            product_type: raw.product_type,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub product: Option<RawProduct>,
}

// =============================================================================
// Collections
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RawCollectionCard {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub image: Option<RawImage>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionsData {
    pub collections: NodesWithPageInfo<RawCollectionCard>,
}

impl From<CollectionsData> for CollectionConnection {
    fn from(data: CollectionsData) -> Self {
        Self {
            collections: data
                .collections
                .nodes
                .into_iter()
                .map(|c| CollectionSummary {
                    id: c.id,
                    handle: c.handle,
                    title: c.title,
                    image: c.image.map(Into::into),
                })
                .collect(),
            page_info: data.collections.page_info.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCollection {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub description: String,
    pub description_html: String,
    pub image: Option<RawImage>,
    pub products: NodesWithPageInfo<RawProductCard>,
    #[serde(default)]
    pub seo: RawSeo,
    pub updated_at: Option<String>,
}

impl From<RawCollection> for Collection {
    fn from(raw: RawCollection) -> Self {
        let products = convert_product_cards(raw.products);
        Self {
            id: raw.id,
            handle: raw.handle,
            title: raw.title,
            description: raw.description,
            description_html: raw.description_html,
            image: raw.image.map(Into::into),
            seo: raw.seo.into(),
            updated_at: raw.updated_at,
            products: products.products,
            page_info: products.page_info,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CollectionData {
    pub collection: Option<RawCollection>,
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCartProduct {
    pub id: String,
    pub handle: String,
    pub title: String,
    pub featured_image: Option<RawImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMerchandise {
    pub id: String,
    pub title: String,
    pub product: RawCartProduct,
    pub price: Money,
    pub compare_at_price: Option<Money>,
    pub selected_options: Vec<RawSelectedOption>,
    pub image: Option<RawImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineCost {
    pub total_amount: Money,
    pub compare_at_amount_per_quantity: Option<Money>,
}

#[derive(Debug, Deserialize)]
pub struct RawCartLine {
    pub id: String,
    pub quantity: i64,
    pub merchandise: RawMerchandise,
    pub attributes: Vec<Attribute>,
    pub cost: RawLineCost,
}

impl From<RawCartLine> for CartLine {
    fn from(raw: RawCartLine) -> Self {
        let m = raw.merchandise;
        Self {
            id: raw.id,
            quantity: raw.quantity,
            merchandise: CartMerchandise {
                id: m.id,
                title: m.title,
                price: m.price,
                compare_at_price: m.compare_at_price,
                selected_options: convert_selected_options(m.selected_options),
                image: m.image.map(Into::into),
                product: CartProduct {
                    id: m.product.id,
                    handle: m.product.handle,
                    title: m.product.title,
                    featured_image: m.product.featured_image.map(Into::into),
                },
            },
            attributes: raw.attributes,
            total_amount: raw.cost.total_amount,
            compare_at_amount_per_quantity: raw.cost.compare_at_amount_per_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCartCost {
    pub subtotal_amount: Money,
    pub total_amount: Money,
    pub total_tax_amount: Option<Money>,
}

#[derive(Debug, Deserialize)]
pub struct RawDiscountCode {
    pub code: String,
    pub applicable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDiscountAllocation {
    pub discounted_amount: Money,
    pub title: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBuyerIdentity {
    pub email: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCart {
    pub id: String,
    pub checkout_url: String,
    pub total_quantity: i64,
    pub lines: Nodes<RawCartLine>,
    pub cost: RawCartCost,
    pub discount_codes: Vec<RawDiscountCode>,
    pub discount_allocations: Vec<RawDiscountAllocation>,
    pub buyer_identity: Option<RawBuyerIdentity>,
    pub attributes: Vec<Attribute>,
    pub note: Option<String>,
}

impl From<RawCart> for Cart {
    fn from(raw: RawCart) -> Self {
        Self {
            id: raw.id,
            checkout_url: raw.checkout_url,
            total_quantity: raw.total_quantity,
            lines: raw.lines.nodes.into_iter().map(Into::into).collect(),
            cost: CartCost {
                subtotal: raw.cost.subtotal_amount,
                total: raw.cost.total_amount,
                total_tax: raw.cost.total_tax_amount,
            },
            discount_codes: raw
                .discount_codes
                .into_iter()
                .map(|c| CartDiscountCode {
                    code: c.code,
                    applicable: c.applicable,
                })
                .collect(),
            discount_allocations: raw
                .discount_allocations
                .into_iter()
                .map(|a| CartDiscountAllocation {
                    discounted_amount: a.discounted_amount,
                    title: a.title,
                    code: a.code,
                })
                .collect(),
            buyer_identity: raw.buyer_identity.map(|b| CartBuyerIdentity {
                email: b.email,
                country_code: b.country_code,
            }),
            attributes: raw.attributes,
            note: raw.note,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CartData {
    pub cart: Option<RawCart>,
}

#[derive(Debug, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Payload shared by every cart mutation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    pub cart: Option<RawCart>,
    pub user_errors: Vec<UserError>,
}

/// Mutation response: a single field named after the mutation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartMutationData {
    #[serde(
        alias = "cartCreate",
        alias = "cartLinesAdd",
        alias = "cartLinesUpdate",
        alias = "cartLinesRemove",
        alias = "cartDiscountCodesUpdate",
        alias = "cartBuyerIdentityUpdate",
        alias = "cartNoteUpdate",
        alias = "cartAttributesUpdate"
    )]
    pub payload: CartPayload,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn money(amount: &str) -> serde_json::Value {
        json!({ "amount": amount, "currencyCode": "EUR" })
    }

    fn card(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "handle": "royal-portrait",
            "title": "Royal Portrait",
            "availableForSale": true,
            "featuredImage": null,
            "priceRange": { "minVariantPrice": money("59.99"), "maxVariantPrice": money("149.99") },
            "compareAtPriceRange": null,
            "collections": { "nodes": [{ "id": "gid://shopify/Collection/9" }] }
        })
    }

    #[test]
    fn test_products_flatten_nodes() {
        let data: ProductsData = serde_json::from_value(json!({
            "products": {
                "nodes": [card("gid://shopify/Product/1")],
                "pageInfo": { "hasNextPage": true, "endCursor": "abc" }
            }
        }))
        .unwrap();

        let connection = ProductConnection::from(data);
        assert_eq!(connection.products.len(), 1);
        let product = connection.products.first().unwrap();
        assert_eq!(product.collection_ids, vec!["gid://shopify/Collection/9"]);
        assert_eq!(
            product.price_range.min_variant_price.amount,
            Decimal::new(5999, 2)
        );
        assert!(connection.page_info.has_next_page);
        assert_eq!(connection.page_info.end_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_search_skips_non_product_nodes() {
        let data: SearchData = serde_json::from_value(json!({
            "search": {
                "nodes": [card("gid://shopify/Product/1"), {}],
                "pageInfo": { "hasNextPage": false, "endCursor": null }
            }
        }))
        .unwrap();

        let connection = ProductConnection::from(data);
        assert_eq!(connection.products.len(), 1);
    }

    #[test]
    fn test_cart_mutation_payload_and_lines() {
        let data: CartMutationData = serde_json::from_value(json!({
            "cartLinesAdd": {
                "cart": {
                    "id": "gid://shopify/Cart/c1",
                    "checkoutUrl": "https://lavistique.nl/checkout",
                    "totalQuantity": 1,
                    "lines": { "nodes": [{
                        "id": "gid://shopify/CartLine/1",
                        "quantity": 1,
                        "merchandise": {
                            "id": "gid://shopify/ProductVariant/5",
                            "title": "Medium",
                            "product": {
                                "id": "gid://shopify/Product/1",
                                "handle": "royal-portrait",
                                "title": "Royal Portrait",
                                "featuredImage": null
                            },
                            "price": money("79.99"),
                            "compareAtPrice": null,
                            "selectedOptions": [{ "name": "Size", "value": "Medium" }],
                            "image": null
                        },
                        "attributes": [{ "key": "_costume_style", "value": "royal-king" }],
                        "cost": { "totalAmount": money("79.99"), "compareAtAmountPerQuantity": null }
                    }]},
                    "cost": {
                        "subtotalAmount": money("79.99"),
                        "totalAmount": money("79.99"),
                        "totalTaxAmount": null
                    },
                    "discountCodes": [{ "code": "WELCOME10", "applicable": true }],
                    "discountAllocations": [],
                    "buyerIdentity": { "email": null, "countryCode": "NL" },
                    "attributes": [],
                    "note": null
                },
                "userErrors": []
            }
        }))
        .unwrap();

        assert!(data.payload.user_errors.is_empty());
        let cart = Cart::from(data.payload.cart.unwrap());
        let line = cart.lines.first().unwrap();
        assert_eq!(line.attribute("_costume_style"), Some("royal-king"));
        assert_eq!(line.merchandise.product.handle, "royal-portrait");
        assert!(cart.has_discount_code("welcome10"));
        assert!(!cart.has_skip_the_line());
    }

    #[test]
    fn test_user_errors_parse() {
        let data: CartMutationData = serde_json::from_value(json!({
            "cartCreate": {
                "cart": null,
                "userErrors": [{ "field": ["lines", "0", "quantity"], "message": "Invalid quantity", "code": "INVALID" }]
            }
        }))
        .unwrap();

        assert!(data.payload.cart.is_none());
        assert_eq!(data.payload.user_errors.first().unwrap().message, "Invalid quantity");
    }
}
