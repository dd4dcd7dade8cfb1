//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! lv-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string
//! - `DATABASE_URL` - fallback when the above is unset
//!
//! Migrations are embedded from `crates/storefront/migrations/`.

use sqlx::postgres::PgPoolOptions;

/// Environment variables checked for the database URL, in order.
const DATABASE_URL_VARS: [&str; 2] = ["STOREFRONT_DATABASE_URL", "DATABASE_URL"];

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {}", DATABASE_URL_VARS.join(" or "))]
    MissingDatabaseUrl,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// First non-empty value from `lookup` for the database URL variables.
fn database_url(lookup: impl Fn(&str) -> Option<String>) -> Result<String, MigrationError> {
    DATABASE_URL_VARS
        .iter()
        .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        .ok_or(MigrationError::MissingDatabaseUrl)
}

/// Run the storefront database migrations.
///
/// # Errors
///
/// Returns an error if no database URL is configured, the database is
/// unreachable, or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    let _ = dotenvy::dotenv();
    let url = database_url(|name| std::env::var(name).ok())?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPoolOptions::new().max_connections(1).connect(&url).await?;

    tracing::info!("Running storefront migrations...");
    let migrator = sqlx::migrate!("../storefront/migrations");
    migrator.run(&pool).await?;

    tracing::info!(count = migrator.iter().count(), "Storefront migrations complete");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_database_url_prefers_storefront_var() {
        let url = database_url(|name| match name {
            "STOREFRONT_DATABASE_URL" => Some("postgres://a/storefront".to_string()),
            _ => Some("postgres://b/other".to_string()),
        })
        .unwrap();
        assert_eq!(url, "postgres://a/storefront");
    }

    #[test]
    fn test_database_url_falls_back() {
        let url = database_url(|name| match name {
            "STOREFRONT_DATABASE_URL" => Some("  ".to_string()),
            "DATABASE_URL" => Some("postgres://b/other".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(url, "postgres://b/other");
    }

    #[test]
    fn test_database_url_missing() {
        let err = database_url(|_| None).unwrap_err();
        assert!(err.to_string().contains("STOREFRONT_DATABASE_URL or DATABASE_URL"));
    }
}
