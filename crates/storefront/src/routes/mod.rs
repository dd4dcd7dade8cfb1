//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                         - Liveness
//! GET  /health/ready                   - Readiness (database)
//!
//! # Pages (locale prefixed: nl, en, de, fr)
//! GET  /{locale}/                      - Home page
//! GET  /{locale}/products/{handle}     - Product page with wizard options
//! GET  /{locale}/collections/{handle}  - Collection page
//! GET  /{locale}/cart                  - Cart page
//!
//! # JSON API
//! /api/locale                          - Shopping locale
//! /api/storefront/...                  - Catalog reads
//! /api/cart/...                        - Session cart
//! /api/wizard/...                      - Portrait wizard
//! /api/promo, /api/discounts/...       - Promo codes and discount rules
//! /api/contacts/...                    - Newsletter
//! /api/chat/...                        - Support chat
//!
//! # Staff API (bearer token)
//! /api/admin/contacts, lists, tags     - CRM
//! /api/admin/support/...               - Ticket desk
//! /api/admin/discounts/...             - Discount rules
//! /api/admin/emails/preview-ready      - Preview email
//! ```

pub mod cart;
pub mod chat;
pub mod contacts;
pub mod discounts;
pub mod locale;
pub mod pages;
pub mod promo;
pub mod storefront;
pub mod support;
pub mod wizard;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post, put},
};
use tower::util::option_layer;

use crate::middleware::{api_rate_limiter, chat_rate_limiter};
use crate::state::AppState;

/// Server-rendered pages.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/{locale}", get(pages::home))
        .route("/{locale}/", get(pages::home))
        .route("/{locale}/products/{handle}", get(pages::product))
        .route("/{locale}/collections/{handle}", get(pages::collection))
        .route("/{locale}/cart", get(pages::cart))
}

/// Catalog reads.
pub fn storefront_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(storefront::products))
        .route("/products/{handle}", get(storefront::product))
        .route("/collections", get(storefront::collections))
        .route("/collections/{handle}", get(storefront::collection))
        .route("/search", get(storefront::search))
}

/// Session cart.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::create))
        .route(
            "/lines",
            post(cart::add_lines)
                .patch(cart::update_lines)
                .delete(cart::remove_lines),
        )
        .route("/discount-codes", put(cart::update_discount_codes))
        .route("/buyer-identity", put(cart::update_buyer_identity))
        .route("/note", put(cart::update_note))
        .route("/attributes", put(cart::update_attributes))
        .route("/promo", post(cart::apply_promo))
        .route("/skip-the-line", post(cart::add_skip_the_line))
}

/// Portrait wizard.
pub fn wizard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wizard::show))
        .route("/product", post(wizard::set_product))
        .route("/costume", post(wizard::select_costume))
        .route("/size", post(wizard::select_size))
        .route("/frame", post(wizard::select_frame))
        .route("/photo", post(wizard::set_photo).delete(wizard::clear_photo))
        .route("/next", post(wizard::next))
        .route("/previous", post(wizard::previous))
        .route("/go-to", post(wizard::go_to))
        .route("/reset", post(wizard::reset))
        .route("/add-to-cart", post(wizard::add_to_cart))
}

/// Chat conversations. The completion proxy is mounted separately so it
/// gets the stricter rate limit.
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/conversation", post(chat::start))
        .route("/conversations", get(chat::list))
        .route("/conversations/{id}", get(chat::show))
        .route("/conversations/{id}/messages", post(chat::add_message))
        .route("/conversations/{id}/email", put(chat::update_email))
        .route("/conversations/{id}/ticket", post(chat::create_ticket))
        .route("/conversations/{id}/close", post(chat::close))
}

/// Staff routes. Every handler extracts `RequireStaff`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // CRM
        .route("/contacts", get(contacts::list))
        .route("/contacts/by-email", get(contacts::by_email))
        .route("/contacts/{id}", get(contacts::show).patch(contacts::update))
        .route("/contacts/{id}/shopify-customer", put(contacts::link_shopify_customer))
        .route(
            "/contacts/{id}/lists/{list_id}",
            post(contacts::add_to_list).delete(contacts::remove_from_list),
        )
        .route(
            "/contacts/{id}/tags/{tag_id}",
            post(contacts::add_tag).delete(contacts::remove_tag),
        )
        .route("/lists", get(contacts::lists).post(contacts::create_list))
        .route("/tags", get(contacts::tags).post(contacts::create_tag))
        // Support desk
        .route("/support/tickets", get(support::tickets))
        .route("/support/tickets/pending", get(support::pending))
        .route("/support/count", get(support::pending_count))
        .route("/support/stats", get(support::stats))
        .route("/support/tickets/{id}", get(support::ticket))
        .route("/support/tickets/{id}/messages", get(support::messages))
        .route("/support/tickets/{id}/reply", post(support::reply))
        .route("/support/tickets/{id}/resolve", post(support::resolve))
        .route("/support/tickets/{id}/assign", post(support::assign))
        .route("/support/tickets/{id}/notes", post(support::add_note))
        .route("/support/tickets/{id}/priority", post(support::set_priority))
        .route("/support/tickets/{id}/status", post(support::set_status))
        // Discount rules
        .route("/discounts", get(discounts::list).post(discounts::create))
        .route(
            "/discounts/{id}",
            patch(discounts::update).delete(discounts::delete),
        )
        // Emails
        .route("/emails/preview-ready", post(support::send_preview_ready))
}

/// The JSON API under `/api`.
pub fn api_routes() -> Router<AppState> {
    let rate_limited = Router::new()
        .route("/locale", get(locale::show).put(locale::update))
        .route("/locale/format", post(locale::format))
        .route("/locale/saved", get(locale::saved))
        .nest("/storefront", storefront_routes())
        .nest("/cart", cart_routes())
        .nest("/wizard", wizard_routes())
        .route(
            "/promo",
            get(promo::show).post(promo::apply).delete(promo::clear),
        )
        .route("/discounts/code/{code}", get(discounts::by_code))
        .route("/discounts/calculate", post(discounts::calculate))
        .route("/contacts/subscribe", post(contacts::subscribe))
        .route("/contacts/unsubscribe", post(contacts::unsubscribe))
        .nest("/chat", chat_routes())
        .nest("/admin", admin_routes())
        .layer(option_layer(api_rate_limiter()));

    let completion = Router::new()
        .route("/chat", post(chat::complete))
        .layer(option_layer(chat_rate_limiter()));

    Router::new().merge(rate_limited).merge(completion)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(page_routes())
        .nest("/api", api_routes())
}

/// Liveness health check. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
