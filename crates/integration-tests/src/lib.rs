//! Integration tests for La Vistique.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lavistique-integration-tests
//! ```
//!
//! Apart from `repositories`, none of the tests need a running database or
//! Shopify store. Router tests build the real application around a lazily
//! connected pool and only hit routes that never reach it. The repository
//! tests are ignored by default; run them against a scratch database with
//! `TEST_DATABASE_URL` set and `-- --ignored`.
//!
//! # Test Files
//!
//! - `discounts` - promo code scenarios
//! - `wizard` - portrait configurator flows
//! - `locale` - locale, currency and price formatting rules
//! - `router` - HTTP behavior of the assembled application
//! - `repositories` - contact and ticket persistence rules

use std::time::Duration;

use axum::Router;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;

use lavistique_storefront::config::{ShopifyStorefrontConfig, StorefrontConfig};
use lavistique_storefront::state::AppState;

/// Staff bearer token used by [`test_config`].
pub const TEST_ADMIN_PASSWORD: &str = "correct-horse-battery-staple-42";

/// Configuration with no chat or email provider.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://lavistique@127.0.0.1:1/lavistique_test"),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        shopify: ShopifyStorefrontConfig {
            store: "lavistique-test.myshopify.com".to_string(),
            api_version: "2024-10".to_string(),
            storefront_token: SecretString::from("test-token"),
        },
        chat: None,
        email: None,
        admin_password: Some(SecretString::from(TEST_ADMIN_PASSWORD)),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// The full application around a pool that never connects eagerly.
///
/// # Panics
///
/// Panics if the test database URL does not parse.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_app(config: StorefrontConfig) -> Router {
    use secrecy::ExposeSecret;

    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(250))
        .connect_lazy(config.database_url.expose_secret())
        .expect("test database URL should parse");
    let state = AppState::new(config, pool).expect("state without optional clients");
    lavistique_storefront::app(state)
}
