//! Shopping locale API: country, language, and display currency.

use std::str::FromStr;

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use lavistique_core::{CountryCode, CurrencyCode, LanguageCode, LocaleConfig, format_price};

use crate::db::PreferenceRepository;
use crate::error::{AppError, Result};
use crate::middleware::locale::{
    COUNTRY_COOKIE, CURRENCY_COOKIE, LANGUAGE_COOKIE, set_cookie, site_cookie,
};
use crate::middleware::{RequestLocale, Visitor};
use crate::models::UserPreference;
use crate::state::AppState;

/// Locale cookies last a year.
const LOCALE_COOKIE_DAYS: i64 = 365;

/// A selectable option.
#[derive(Debug, Serialize)]
pub struct Choice {
    pub code: &'static str,
    pub name: &'static str,
}

/// Current locale plus the selector lists.
#[derive(Debug, Serialize)]
pub struct LocaleResponse {
    #[serde(flatten)]
    pub locale: LocaleConfig,
    pub countries: Vec<Choice>,
    pub languages: Vec<Choice>,
    pub currencies: Vec<Choice>,
}

impl From<LocaleConfig> for LocaleResponse {
    fn from(locale: LocaleConfig) -> Self {
        Self {
            locale,
            countries: CountryCode::ALL
                .into_iter()
                .map(|c| Choice {
                    code: c.as_str(),
                    name: c.display_name(),
                })
                .collect(),
            languages: LanguageCode::ALL
                .into_iter()
                .map(|l| Choice {
                    code: l.as_str(),
                    name: l.display_name(),
                })
                .collect(),
            currencies: CurrencyCode::ALL
                .into_iter()
                .map(|c| Choice {
                    code: c.as_str(),
                    name: c.display_name(),
                })
                .collect(),
        }
    }
}

/// Locale change request. Omitted fields stay as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateLocaleRequest {
    pub country: Option<CountryCode>,
    pub language: Option<LanguageCode>,
    pub currency: Option<CurrencyCode>,
}

/// Apply a change: the currency follows a new country unless the request
/// also names a currency.
#[must_use]
pub fn apply_update(mut locale: LocaleConfig, update: &UpdateLocaleRequest) -> LocaleConfig {
    if let Some(country) = update.country {
        locale.set_country(country);
    }
    if let Some(language) = update.language {
        locale.set_language(language);
    }
    if let Some(currency) = update.currency {
        locale.set_currency(currency);
    }
    locale
}

/// `GET /api/locale`
pub async fn show(RequestLocale(locale): RequestLocale) -> Json<LocaleResponse> {
    Json(locale.into())
}

/// `PUT /api/locale`
///
/// Stores the result in cookies and in the visitor's saved preference.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Visitor(visitor): Visitor,
    RequestLocale(current): RequestLocale,
    Json(request): Json<UpdateLocaleRequest>,
) -> Result<Response> {
    let locale = apply_update(current, &request);

    PreferenceRepository::new(state.pool())
        .upsert(visitor, &locale)
        .await?;

    let mut response = Json(LocaleResponse::from(locale)).into_response();
    for (name, value) in [
        (COUNTRY_COOKIE, locale.country.as_str()),
        (LANGUAGE_COOKIE, locale.language.as_str()),
        (CURRENCY_COOKIE, locale.currency.as_str()),
    ] {
        set_cookie(
            &mut response,
            &site_cookie(name, value.to_string(), LOCALE_COOKIE_DAYS),
        );
    }

    Ok(response)
}

/// `GET /api/locale/saved`
///
/// The locale this visitor last chose, `null` when they never picked one.
pub async fn saved(
    State(state): State<AppState>,
    Visitor(visitor): Visitor,
) -> Result<Json<Option<UserPreference>>> {
    Ok(Json(PreferenceRepository::new(state.pool()).get(visitor).await?))
}

/// An amount sent as a JSON number (`59.99`) or string (`"59.99"`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(serde_json::Number),
    Text(String),
}

impl AmountInput {
    /// Parse into an exact decimal.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when the value is not a decimal number.
    pub fn to_decimal(&self) -> Result<Decimal> {
        let raw = match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.trim().to_string(),
        };
        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map_err(|_| AppError::BadRequest(format!("Invalid amount: {raw}")))
    }
}

/// Amount to format.
#[derive(Debug, Deserialize)]
pub struct FormatRequest {
    pub amount: AmountInput,
    /// Overrides the active currency.
    pub currency: Option<CurrencyCode>,
}

#[derive(Debug, Serialize)]
pub struct FormatResponse {
    pub formatted: String,
    pub currency: CurrencyCode,
}

/// `POST /api/locale/format`
pub async fn format(
    RequestLocale(locale): RequestLocale,
    Json(request): Json<FormatRequest>,
) -> Result<Json<FormatResponse>> {
    let amount = request.amount.to_decimal()?;
    let currency = request.currency.unwrap_or(locale.currency);
    Ok(Json(FormatResponse {
        formatted: format_price(amount, currency),
        currency,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_country_change_moves_currency() {
        let locale = apply_update(
            LocaleConfig::default(),
            &UpdateLocaleRequest {
                country: Some(CountryCode::Gb),
                ..Default::default()
            },
        );
        assert_eq!(locale.currency, CurrencyCode::Gbp);
    }

    #[test]
    fn test_explicit_currency_beats_country() {
        let locale = apply_update(
            LocaleConfig::default(),
            &UpdateLocaleRequest {
                country: Some(CountryCode::Us),
                language: Some(LanguageCode::En),
                currency: Some(CurrencyCode::Eur),
            },
        );
        assert_eq!(locale.country, CountryCode::Us);
        assert_eq!(locale.language, LanguageCode::En);
        assert_eq!(locale.currency, CurrencyCode::Eur);
    }

    #[test]
    fn test_amount_input() {
        let number: FormatRequest = serde_json::from_str(r#"{"amount": 59.99}"#).unwrap();
        assert_eq!(number.amount.to_decimal().unwrap(), Decimal::new(5999, 2));

        let text: FormatRequest =
            serde_json::from_str(r#"{"amount": "109.99", "currency": "GBP"}"#).unwrap();
        assert_eq!(text.amount.to_decimal().unwrap(), Decimal::new(10999, 2));
        assert_eq!(text.currency, Some(CurrencyCode::Gbp));

        let bad: FormatRequest = serde_json::from_str(r#"{"amount": "lots"}"#).unwrap();
        assert!(bad.amount.to_decimal().is_err());
    }

    #[test]
    fn test_locale_response_shape() {
        let json = serde_json::to_value(LocaleResponse::from(LocaleConfig::default())).unwrap();
        assert_eq!(json["country"], "NL");
        assert_eq!(json["currency"], "EUR");
        assert_eq!(json["countries"].as_array().unwrap().len(), 12);
        assert_eq!(json["languages"][1]["code"], "EN");
    }
}
