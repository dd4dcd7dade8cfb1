//! Shopify Storefront API client.
//!
//! # Architecture
//!
//! - Shopify is source of truth for catalog and carts: no local sync, direct API calls
//! - Queries are plain GraphQL documents; responses are parsed through
//!   `graphql_client::Response` into private wire types and flattened into
//!   the domain types in [`types`]
//! - In-memory caching via `moka` for catalog reads (5 minute TTL)
//! - Every request can be localized with the `@inContext` directive
//!
//! # Example
//!
//! ```rust,ignore
//! use lavistique_storefront::shopify::{CartLineInput, StorefrontClient};
//!
//! let client = StorefrontClient::new(&config.shopify);
//!
//! let product = client.get_product_by_handle("custom-pet-portrait", locale).await?;
//! let cart = client.create_cart(CartInput::default(), locale).await?;
//! let cart = client.add_lines(&cart.id, vec![CartLineInput {
//!     merchandise_id: product.variants[0].id.clone(),
//!     quantity: 1,
//!     attributes: vec![],
//! }], locale).await?;
//! ```

mod storefront;
pub mod types;

pub use storefront::{StorefrontClient, with_context};
pub use types::*;

use thiserror::Error;

/// Upper bound on response text carried in errors and logs.
const BODY_EXCERPT_CHARS: usize = 200;

/// Storefront API failures.
#[derive(Debug, Error)]
pub enum ShopifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer other than 429. `body` is truncated.
    #[error("Shopify returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL errors: {}", join_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// 200 with neither `data` nor `errors`.
    #[error("Empty GraphQL response")]
    EmptyResponse,

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Throttled; the value is the `Retry-After` delay in seconds.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// `userErrors` from a cart mutation, or input rejected before sending.
    #[error("User error: {0}")]
    UserError(String),
}

impl ShopifyError {
    /// `Status` error with the body cut to a loggable excerpt.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self::Status {
            status,
            body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
        }
    }
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphQLError {
    pub message: String,
    /// Response path joined with dots (`products.edges.0`), empty when absent.
    pub path: String,
}

impl From<graphql_client::Error> for GraphQLError {
    fn from(e: graphql_client::Error) -> Self {
        let path = e
            .path
            .unwrap_or_default()
            .into_iter()
            .map(|fragment| match fragment {
                graphql_client::PathFragment::Key(key) => key,
                graphql_client::PathFragment::Index(i) => i.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        Self {
            message: e.message,
            path,
        }
    }
}

impl std::fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.message.is_empty(), self.path.is_empty()) {
            (false, true) => f.write_str(&self.message),
            (false, false) => write!(f, "{} (at {})", self.message, self.path),
            (true, false) => write!(f, "unnamed error at {}", self.path),
            (true, true) => f.write_str("unnamed error"),
        }
    }
}

fn join_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "none reported".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Numeric tail of a Shopify global ID (`gid://shopify/Product/123` -> `123`).
///
/// Strings without a `/` are returned unchanged.
#[must_use]
pub fn parse_shopify_id(gid: &str) -> &str {
    gid.rsplit('/').next().unwrap_or(gid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(message: &str, path: &str) -> GraphQLError {
        GraphQLError {
            message: message.to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn test_graphql_errors_join() {
        let err = ShopifyError::GraphQL(vec![
            error("Field 'foo' doesn't exist on type 'Product'", ""),
            error("Invalid global id", "cart"),
        ]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field 'foo' doesn't exist on type 'Product'; Invalid global id (at cart)"
        );
    }

    #[test]
    fn test_graphql_error_without_message() {
        assert_eq!(error("", "products.edges.0").to_string(), "unnamed error at products.edges.0");
        assert_eq!(error("", "").to_string(), "unnamed error");
        assert_eq!(
            ShopifyError::GraphQL(vec![]).to_string(),
            "GraphQL errors: none reported"
        );
    }

    #[test]
    fn test_status_error_truncates_body() {
        let body = "x".repeat(1_000);
        let ShopifyError::Status { status, body } = ShopifyError::status(503, &body) else {
            panic!("expected a status error");
        };
        assert_eq!(status, 503);
        assert_eq!(body.len(), BODY_EXCERPT_CHARS);
    }

    #[test]
    fn test_parse_shopify_id() {
        assert_eq!(parse_shopify_id("gid://shopify/Product/8123456789"), "8123456789");
        assert_eq!(
            parse_shopify_id("gid://shopify/CartLine/abc?cart=xyz"),
            "abc?cart=xyz"
        );
        assert_eq!(parse_shopify_id("8123456789"), "8123456789");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ShopifyError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
