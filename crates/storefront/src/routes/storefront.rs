//! Catalog JSON API backed by the Storefront client.
//!
//! Every call is localized with the shopper's country and language.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequestLocale;
use crate::shopify::types::{Collection, CollectionConnection, Product, ProductConnection};
use crate::state::AppState;

/// Cursor pagination parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub first: Option<i64>,
    pub after: Option<String>,
}

/// Search parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub first: Option<i64>,
    pub after: Option<String>,
}

/// `GET /api/storefront/products`
#[instrument(skip(state))]
pub async fn products(
    State(state): State<AppState>,
    locale: RequestLocale,
    Query(params): Query<PageParams>,
) -> Result<Json<ProductConnection>> {
    let products = state
        .storefront()
        .get_products(params.first, params.after, locale.locale())
        .await?;
    Ok(Json(products))
}

/// `GET /api/storefront/products/{handle}`
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    locale: RequestLocale,
    Path(handle): Path<String>,
) -> Result<Json<Product>> {
    let product = state
        .storefront()
        .get_product_by_handle(&handle, locale.locale())
        .await?;
    Ok(Json(product))
}

/// `GET /api/storefront/collections`
#[instrument(skip(state))]
pub async fn collections(
    State(state): State<AppState>,
    locale: RequestLocale,
    Query(params): Query<PageParams>,
) -> Result<Json<CollectionConnection>> {
    let collections = state
        .storefront()
        .get_collections(params.first, locale.locale())
        .await?;
    Ok(Json(collections))
}

/// `GET /api/storefront/collections/{handle}`
#[instrument(skip(state))]
pub async fn collection(
    State(state): State<AppState>,
    locale: RequestLocale,
    Path(handle): Path<String>,
    Query(params): Query<PageParams>,
) -> Result<Json<Collection>> {
    let collection = state
        .storefront()
        .get_collection_by_handle(&handle, params.first, params.after, locale.locale())
        .await?;
    Ok(Json(collection))
}

/// `GET /api/storefront/search`
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    locale: RequestLocale,
    Query(params): Query<SearchParams>,
) -> Result<Json<ProductConnection>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("Search query required".to_string()));
    }

    let results = state
        .storefront()
        .search_products(query, params.first, params.after, locale.locale())
        .await?;
    Ok(Json(results))
}
