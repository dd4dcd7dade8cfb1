//! Cache types for Storefront API responses.

use lavistique_core::Locale;

use crate::shopify::types::{Collection, CollectionConnection, Product, ProductConnection};

/// Cache key for catalog reads. Every key carries the locale because
/// `@inContext` changes prices and translations.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product {
        handle: String,
        locale: Locale,
    },
    Products {
        first: i64,
        cursor: Option<String>,
        locale: Locale,
    },
    Collection {
        handle: String,
        first: i64,
        cursor: Option<String>,
        locale: Locale,
    },
    Collections {
        first: i64,
        locale: Locale,
    },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(ProductConnection),
    Collection(Box<Collection>),
    Collections(CollectionConnection),
}
