//! Database operations for storefront `PostgreSQL`.
//!
//! Stores local data only (Shopify is source of truth for products, carts,
//! and orders). All tables live in the `storefront` schema:
//!
//! - `user_preference` - Visitor locale choices
//! - `contact`, `list`, `contact_list`, `tag`, `contact_tag` - CRM
//! - `conversation`, `message`, `support_ticket` - Support chat
//! - `discount_rule` - Promo codes mirrored from Shopify
//!
//! Sessions are stored by `tower-sessions` in `tower_sessions.session`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p lavistique-cli -- migrate
//! ```

pub mod contacts;
pub mod conversations;
pub mod discounts;
pub mod preferences;
pub mod tickets;

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use contacts::ContactRepository;
pub use conversations::ConversationRepository;
pub use discounts::{DiscountRepository, NewDiscountRule, UpdateDiscountRule};
pub use preferences::PreferenceRepository;
pub use tickets::TicketRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Parse a text column into a typed value, flagging unknown values.
pub(crate) fn parse_column<T>(column: &str, value: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column}: {e}")))
}

/// Map a unique-constraint violation to `Conflict`, pass everything else through.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_string());
    }
    RepositoryError::Database(e)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lavistique_core::TicketStatus;

    #[test]
    fn test_parse_column_known_value() {
        let status: TicketStatus = parse_column("status", "in_progress").unwrap();
        assert_eq!(status, TicketStatus::InProgress);
    }

    #[test]
    fn test_parse_column_unknown_value_is_corruption() {
        let err = parse_column::<TicketStatus>("status", "escalated").unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(msg) if msg.contains("status")));
    }

    #[test]
    fn test_conflict_on_unique_passes_other_errors() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "duplicate");
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
