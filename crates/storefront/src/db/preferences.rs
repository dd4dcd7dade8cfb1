//! Database operations for visitor locale preferences.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use lavistique_core::{LocaleConfig, VisitorId};

use super::{RepositoryError, parse_column};
use crate::models::UserPreference;

#[derive(Debug, sqlx::FromRow)]
struct UserPreferenceRow {
    id: Uuid,
    visitor_id: Uuid,
    country: String,
    language: String,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserPreferenceRow> for UserPreference {
    type Error = RepositoryError;

    fn try_from(row: UserPreferenceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            visitor_id: VisitorId::from_uuid(row.visitor_id),
            country: parse_column("country", &row.country)?,
            language: parse_column("language", &row.language)?,
            currency: parse_column("currency", &row.currency)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for visitor preferences.
pub struct PreferenceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PreferenceRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the stored preference for a visitor.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, visitor: VisitorId) -> Result<Option<UserPreference>, RepositoryError> {
        let row = sqlx::query_as::<_, UserPreferenceRow>(
            r"
            SELECT id, visitor_id, country, language, currency, created_at, updated_at
            FROM storefront.user_preference
            WHERE visitor_id = $1
            ",
        )
        .bind(visitor)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert or replace a visitor's locale preference.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(
        &self,
        visitor: VisitorId,
        locale: &LocaleConfig,
    ) -> Result<UserPreference, RepositoryError> {
        let row = sqlx::query_as::<_, UserPreferenceRow>(
            r"
            INSERT INTO storefront.user_preference (id, visitor_id, country, language, currency)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (visitor_id) DO UPDATE
            SET country = EXCLUDED.country,
                language = EXCLUDED.language,
                currency = EXCLUDED.currency,
                updated_at = NOW()
            RETURNING id, visitor_id, country, language, currency, created_at, updated_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(visitor)
        .bind(locale.country.as_str())
        .bind(locale.language.as_str())
        .bind(locale.currency.as_str())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }
}
