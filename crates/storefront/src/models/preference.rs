//! Visitor locale preference.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use lavistique_core::{CountryCode, CurrencyCode, LanguageCode, LocaleConfig, VisitorId};

/// Stored locale choice of a visitor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreference {
    pub id: Uuid,
    pub visitor_id: VisitorId,
    pub country: CountryCode,
    pub language: LanguageCode,
    pub currency: CurrencyCode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreference {
    #[must_use]
    pub const fn locale_config(&self) -> LocaleConfig {
        LocaleConfig {
            country: self.country,
            language: self.language,
            currency: self.currency,
        }
    }
}
