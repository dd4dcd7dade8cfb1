//! Shopify Storefront API client implementation.
//!
//! Sends GraphQL documents over `reqwest` 0.13 and parses the envelope with
//! `graphql_client::Response`. Catalog reads are cached with `moka`
//! (5-minute TTL); cart reads and mutations always hit the API.

mod cache;
mod conversions;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use graphql_client::Response;
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use lavistique_core::Locale;

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::types::{
    AttributeInput, BuyerIdentityInput, Cart, CartInput, CartLineInput, CartLineUpdateInput,
    Collection, CollectionConnection, Product, ProductConnection,
};
use crate::shopify::{GraphQLError, ShopifyError};

use cache::{CacheKey, CacheValue};
use conversions::{
    CartData, CartMutationData, CollectionData, CollectionsData, ProductData, ProductsData,
    SearchData,
};

/// Default page size for catalog listings.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page size the API accepts.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Clamp a requested page size into `1..=100`, defaulting to 20.
#[must_use]
pub fn page_size(first: Option<i64>) -> i64 {
    first.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

// =============================================================================
// Localization
// =============================================================================

/// Add an `@inContext(country, language)` directive to a named operation.
///
/// The directive is placed after the operation name and its variable
/// definitions. Anonymous operations and fragments are returned unchanged.
#[must_use]
pub fn with_context(query: &str, locale: Locale) -> String {
    let directive = format!(
        " @inContext(country: {}, language: {})",
        locale.country.as_str(),
        locale.language.as_str()
    );

    match directive_position(query) {
        Some(pos) => {
            let (head, tail) = query.split_at(pos);
            format!("{head}{directive}{tail}")
        }
        None => query.to_string(),
    }
}

/// Byte offset right after `query Name(...)` / `mutation Name(...)`.
fn directive_position(query: &str) -> Option<usize> {
    let start = query.len() - query.trim_start().len();
    let rest = query.get(start..)?;

    let keyword_len = ["query", "mutation"]
        .into_iter()
        .find(|kw| rest.starts_with(kw))?
        .len();

    let after_keyword = rest.get(keyword_len..)?;
    let gap = after_keyword.len() - after_keyword.trim_start().len();
    if gap == 0 {
        return None;
    }

    let name_start = start + keyword_len + gap;
    let name_len: usize = query
        .get(name_start..)?
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(char::len_utf8)
        .sum();
    if name_len == 0 {
        return None;
    }

    let name_end = name_start + name_len;
    let after_name = query.get(name_end..)?;
    let trimmed = after_name.trim_start();
    if trimmed.starts_with('(') {
        let open = name_end + (after_name.len() - trimmed.len());
        let close = query.get(open..)?.find(')')?;
        return Some(open + close + 1);
    }

    Some(name_end)
}

// =============================================================================
// StorefrontClient
// =============================================================================

/// Request body for a GraphQL call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQLRequest<'a, V> {
    query: &'a str,
    variables: V,
    operation_name: Option<&'a str>,
}

/// Client for the Shopify Storefront API.
///
/// Catalog reads (products, collections) are cached for 5 minutes per
/// locale.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let endpoint = format!(
            "https://{}/api/{}/graphql.json",
            config.store, config.api_version
        );

        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::new(),
                endpoint,
                access_token: config.storefront_token.expose_secret().to_string(),
                cache,
            }),
        }
    }

    /// API endpoint this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Execute a localized GraphQL operation.
    async fn execute<T, V>(
        &self,
        query: &str,
        variables: V,
        locale: Locale,
    ) -> Result<T, ShopifyError>
    where
        T: DeserializeOwned,
        V: Serialize,
    {
        let query = with_context(query, locale);
        let body = GraphQLRequest {
            query: &query,
            variables,
            operation_name: operation_name(&query),
        };

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header("X-Shopify-Storefront-Access-Token", &self.inner.access_token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ShopifyError::RateLimited(retry_after(response.headers())));
        }

        let text = response.text().await?;
        if !status.is_success() {
            tracing::error!(
                %status,
                body = %excerpt(&text),
                "Shopify answered with an error status"
            );
            return Err(ShopifyError::status(status.as_u16(), &text));
        }

        let response: Response<T> = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, body = %excerpt(&text), "Unparseable Shopify response");
            ShopifyError::Parse(e)
        })?;

        match (response.data, response.errors) {
            (_, Some(errors)) if !errors.is_empty() => {
                debug!(?errors, "GraphQL errors in response");
                Err(ShopifyError::GraphQL(
                    errors.into_iter().map(GraphQLError::from).collect(),
                ))
            }
            (Some(data), _) => Ok(data),
            (None, _) => {
                tracing::error!(
                    body = %excerpt(&text),
                    "Shopify response has neither data nor errors"
                );
                Err(ShopifyError::EmptyResponse)
            }
        }
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Get a paginated list of products.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_products(
        &self,
        first: Option<i64>,
        after: Option<String>,
        locale: Locale,
    ) -> Result<ProductConnection, ShopifyError> {
        let first = page_size(first);
        let key = CacheKey::Products {
            first,
            cursor: after.clone(),
            locale,
        };

        if let Some(CacheValue::Products(products)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let data: ProductsData = self
            .execute(
                queries::GET_PRODUCTS,
                json!({ "first": first, "after": after }),
                locale,
            )
            .await?;
        let connection = ProductConnection::from(data);

        self.inner
            .cache
            .insert(key, CacheValue::Products(connection.clone()))
            .await;

        Ok(connection)
    }

    /// Get a product by its handle.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if no product has this handle, or an
    /// error if the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_product_by_handle(
        &self,
        handle: &str,
        locale: Locale,
    ) -> Result<Product, ShopifyError> {
        let key = CacheKey::Product {
            handle: handle.to_string(),
            locale,
        };

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let data: ProductData = self
            .execute(
                queries::GET_PRODUCT_BY_HANDLE,
                json!({ "handle": handle }),
                locale,
            )
            .await?;

        let product: Product = data
            .product
            .ok_or_else(|| ShopifyError::NotFound(format!("Product not found: {handle}")))?
            .into();

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Full-text product search. Results are not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        query: &str,
        first: Option<i64>,
        after: Option<String>,
        locale: Locale,
    ) -> Result<ProductConnection, ShopifyError> {
        let data: SearchData = self
            .execute(
                queries::SEARCH_PRODUCTS,
                json!({ "query": query, "first": page_size(first), "after": after }),
                locale,
            )
            .await?;
        Ok(data.into())
    }

    // =========================================================================
    // Collection Methods
    // =========================================================================

    /// Get a list of collections.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_collections(
        &self,
        first: Option<i64>,
        locale: Locale,
    ) -> Result<CollectionConnection, ShopifyError> {
        let first = page_size(first);
        let key = CacheKey::Collections { first, locale };

        if let Some(CacheValue::Collections(collections)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for collections");
            return Ok(collections);
        }

        let data: CollectionsData = self
            .execute(queries::GET_COLLECTIONS, json!({ "first": first }), locale)
            .await?;
        let connection = CollectionConnection::from(data);

        self.inner
            .cache
            .insert(key, CacheValue::Collections(connection.clone()))
            .await;

        Ok(connection)
    }

    /// Get a collection by its handle with a page of its products.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if no collection has this handle, or
    /// an error if the API request fails.
    #[instrument(skip(self), fields(handle = %handle))]
    pub async fn get_collection_by_handle(
        &self,
        handle: &str,
        first: Option<i64>,
        after: Option<String>,
        locale: Locale,
    ) -> Result<Collection, ShopifyError> {
        let first = page_size(first);
        let key = CacheKey::Collection {
            handle: handle.to_string(),
            first,
            cursor: after.clone(),
            locale,
        };

        if let Some(CacheValue::Collection(collection)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for collection");
            return Ok(*collection);
        }

        let data: CollectionData = self
            .execute(
                queries::GET_COLLECTION_BY_HANDLE,
                json!({ "handle": handle, "first": first, "after": after }),
                locale,
            )
            .await?;

        let collection: Collection = data
            .collection
            .ok_or_else(|| ShopifyError::NotFound(format!("Collection not found: {handle}")))?
            .into();

        self.inner
            .cache
            .insert(key, CacheValue::Collection(Box::new(collection.clone())))
            .await;

        Ok(collection)
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Get a cart by ID. Returns `None` for unknown or expired carts.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(
        &self,
        cart_id: &str,
        locale: Locale,
    ) -> Result<Option<Cart>, ShopifyError> {
        let data: CartData = self
            .execute(queries::GET_CART, json!({ "cartId": cart_id }), locale)
            .await?;
        Ok(data.cart.map(Into::into))
    }

    /// Create a new cart.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` if Shopify rejects the input.
    #[instrument(skip(self, input), fields(lines = input.lines.len()))]
    pub async fn create_cart(
        &self,
        input: CartInput,
        locale: Locale,
    ) -> Result<Cart, ShopifyError> {
        self.mutate_cart(queries::CREATE_CART, json!({ "input": input }), locale)
            .await
    }

    /// Add lines to a cart.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` for a quantity below 1 or when
    /// Shopify rejects the lines.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id, lines = lines.len()))]
    pub async fn add_lines(
        &self,
        cart_id: &str,
        lines: Vec<CartLineInput>,
        locale: Locale,
    ) -> Result<Cart, ShopifyError> {
        if lines.iter().any(|l| l.quantity < 1) {
            return Err(ShopifyError::UserError(
                "Quantity must be at least 1".to_string(),
            ));
        }
        self.mutate_cart(
            queries::ADD_CART_LINES,
            json!({ "cartId": cart_id, "lines": lines }),
            locale,
        )
        .await
    }

    /// Change line quantities. A quantity of 0 removes the line.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::UserError` for a negative quantity or when
    /// Shopify rejects the update.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id, lines = lines.len()))]
    pub async fn update_lines(
        &self,
        cart_id: &str,
        lines: Vec<CartLineUpdateInput>,
        locale: Locale,
    ) -> Result<Cart, ShopifyError> {
        if lines.iter().any(|l| l.quantity < 0) {
            return Err(ShopifyError::UserError(
                "Quantity cannot be negative".to_string(),
            ));
        }
        self.mutate_cart(
            queries::UPDATE_CART_LINES,
            json!({ "cartId": cart_id, "lines": lines }),
            locale,
        )
        .await
    }

    /// Remove lines from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id, lines = line_ids.len()))]
    pub async fn remove_lines(
        &self,
        cart_id: &str,
        line_ids: Vec<String>,
        locale: Locale,
    ) -> Result<Cart, ShopifyError> {
        self.mutate_cart(
            queries::REMOVE_CART_LINES,
            json!({ "cartId": cart_id, "lineIds": line_ids }),
            locale,
        )
        .await
    }

    /// Replace the discount codes on a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn update_discount_codes(
        &self,
        cart_id: &str,
        codes: Vec<String>,
        locale: Locale,
    ) -> Result<Cart, ShopifyError> {
        self.mutate_cart(
            queries::UPDATE_CART_DISCOUNT_CODES,
            json!({ "cartId": cart_id, "discountCodes": codes }),
            locale,
        )
        .await
    }

    /// Set buyer email and country on a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, identity), fields(cart_id = %cart_id))]
    pub async fn update_buyer_identity(
        &self,
        cart_id: &str,
        identity: BuyerIdentityInput,
        locale: Locale,
    ) -> Result<Cart, ShopifyError> {
        self.mutate_cart(
            queries::UPDATE_CART_BUYER_IDENTITY,
            json!({ "cartId": cart_id, "buyerIdentity": identity }),
            locale,
        )
        .await
    }

    /// Set the order note on a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, note), fields(cart_id = %cart_id))]
    pub async fn update_note(
        &self,
        cart_id: &str,
        note: &str,
        locale: Locale,
    ) -> Result<Cart, ShopifyError> {
        self.mutate_cart(
            queries::UPDATE_CART_NOTE,
            json!({ "cartId": cart_id, "note": note }),
            locale,
        )
        .await
    }

    /// Replace the cart-level custom attributes.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, attributes), fields(cart_id = %cart_id))]
    pub async fn update_attributes(
        &self,
        cart_id: &str,
        attributes: Vec<AttributeInput>,
        locale: Locale,
    ) -> Result<Cart, ShopifyError> {
        self.mutate_cart(
            queries::UPDATE_CART_ATTRIBUTES,
            json!({ "cartId": cart_id, "attributes": attributes }),
            locale,
        )
        .await
    }

    /// Run a cart mutation and unwrap its `{ cart, userErrors }` payload.
    async fn mutate_cart(
        &self,
        query: &str,
        variables: serde_json::Value,
        locale: Locale,
    ) -> Result<Cart, ShopifyError> {
        let data: CartMutationData = self.execute(query, variables, locale).await?;
        let payload = data.payload;

        if !payload.user_errors.is_empty() {
            let message = payload
                .user_errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ShopifyError::UserError(message));
        }

        payload
            .cart
            .map(Into::into)
            .ok_or_else(|| ShopifyError::NotFound("Cart not found".to_string()))
    }
}

/// Seconds from a `Retry-After` header, defaulting to 1.
fn retry_after(headers: &reqwest::header::HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(1)
}

/// First 500 characters of a response body, for logs.
fn excerpt(body: &str) -> String {
    body.chars().take(500).collect()
}

/// Operation name of a document (`query GetCart(...)` -> `GetCart`).
fn operation_name(query: &str) -> Option<&str> {
    let rest = query.trim_start();
    let rest = rest
        .strip_prefix("query")
        .or_else(|| rest.strip_prefix("mutation"))?
        .trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(rest.len());
    rest.get(..end).filter(|name| !name.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lavistique_core::{CountryCode, LanguageCode};

    fn locale() -> Locale {
        Locale::new(CountryCode::De, LanguageCode::De)
    }

    #[test]
    fn test_with_context_after_variables() {
        let query = "query GetCart($cartId: ID!) {\n  cart(id: $cartId) { id }\n}";
        assert_eq!(
            with_context(query, locale()),
            "query GetCart($cartId: ID!) @inContext(country: DE, language: DE) {\n  cart(id: $cartId) { id }\n}"
        );
    }

    #[test]
    fn test_with_context_without_variables() {
        let query = "\n  query Shop { shop { name } }";
        assert_eq!(
            with_context(query, locale()),
            "\n  query Shop @inContext(country: DE, language: DE) { shop { name } }"
        );
    }

    #[test]
    fn test_with_context_mutation() {
        let localized = with_context(queries::ADD_CART_LINES, locale());
        assert!(localized.starts_with(
            "mutation AddCartLines($cartId: ID!, $lines: [CartLineInput!]!) @inContext(country: DE, language: DE) {"
        ));
    }

    #[test]
    fn test_with_context_leaves_anonymous_operations() {
        let query = "{ shop { name } }";
        assert_eq!(with_context(query, locale()), query);

        let query = "query { shop { name } }";
        assert_eq!(with_context(query, locale()), query);
    }

    #[test]
    fn test_operation_name() {
        assert_eq!(operation_name(queries::GET_PRODUCTS), Some("GetProducts"));
        assert_eq!(operation_name(queries::CREATE_CART), Some("CreateCart"));
        assert_eq!(operation_name("{ shop { name } }"), None);
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(retry_after(&headers), 1);
        headers.insert(reqwest::header::RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(retry_after(&headers), 30);
        headers.insert(reqwest::header::RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(retry_after(&headers), 1);
    }

    #[test]
    fn test_page_size() {
        assert_eq!(page_size(None), 20);
        assert_eq!(page_size(Some(0)), 1);
        assert_eq!(page_size(Some(250)), 100);
    }

    #[test]
    fn test_endpoint_from_config() {
        let client = StorefrontClient::new(&ShopifyStorefrontConfig {
            store: "lavistique.myshopify.com".to_string(),
            api_version: "2024-10".to_string(),
            storefront_token: secrecy::SecretString::from("token"),
        });
        assert_eq!(
            client.endpoint(),
            "https://lavistique.myshopify.com/api/2024-10/graphql.json"
        );
    }
}
