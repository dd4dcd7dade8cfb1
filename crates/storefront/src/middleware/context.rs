//! Per-request shopper context extractors.
//!
//! - [`RequestLocale`] - shopping locale from `lvq_country` / `lvq_language`
//!   / `lvq_currency` cookies
//! - [`ActivePromo`] - promo code remembered in `lvq_promo`
//! - [`Visitor`] - anonymous visitor identity held in the session

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use tower_sessions::Session;

use lavistique_core::{
    CountryCode, CurrencyCode, LanguageCode, Locale, LocaleConfig, VisitorId, detect_currency,
};

use crate::error::AppError;
use crate::middleware::locale::{
    COUNTRY_COOKIE, CURRENCY_COOKIE, LANGUAGE_COOKIE, PROMO_COOKIE, promo_code, read_cookie,
};
use crate::models::{CurrentVisitor, keys};

/// The shopper's locale preference for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLocale(pub LocaleConfig);

impl RequestLocale {
    /// Build from request cookies. Unknown values fall back to NL/NL. Without
    /// a currency cookie the currency follows the saved country, or is
    /// guessed from the browser language when no country was chosen yet.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let saved_country = read_cookie(headers, COUNTRY_COOKIE)
            .and_then(|v| v.parse::<CountryCode>().ok());
        let country = saved_country.unwrap_or_default();
        let language = read_cookie(headers, LANGUAGE_COOKIE)
            .and_then(|v| v.parse::<LanguageCode>().ok())
            .unwrap_or_default();
        let currency = read_cookie(headers, CURRENCY_COOKIE)
            .and_then(|v| v.parse::<CurrencyCode>().ok())
            .or_else(|| saved_country.map(CountryCode::currency))
            .unwrap_or_else(|| detect_currency(browser_locale(headers)));

        Self(LocaleConfig {
            country,
            language,
            currency,
        })
    }

    /// Locale for Storefront API calls.
    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.0.locale()
    }
}

/// First tag of `Accept-Language` (`en-US,en;q=0.9` -> `en-US`).
fn browser_locale(headers: &HeaderMap) -> &str {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|tag| tag.split(';').next())
        .map_or("", str::trim)
}

impl<S> FromRequestParts<S> for RequestLocale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Promo code remembered from an earlier `?promo=` visit, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivePromo(pub Option<String>);

impl<S> FromRequestParts<S> for ActivePromo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            read_cookie(&parts.headers, PROMO_COOKIE).and_then(|code| promo_code(&code)),
        ))
    }
}

/// The anonymous visitor behind this session, created on first use.
#[derive(Debug, Clone, Copy)]
pub struct Visitor(pub VisitorId);

impl<S> FromRequestParts<S> for Visitor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(format!("Session unavailable: {msg}")))?;

        if let Some(visitor) = session
            .get::<CurrentVisitor>(keys::VISITOR)
            .await
            .map_err(|e| AppError::Internal(format!("Session read failed: {e}")))?
        {
            return Ok(Self(visitor.id));
        }

        let visitor = CurrentVisitor {
            id: VisitorId::new(),
        };
        session
            .insert(keys::VISITOR, visitor)
            .await
            .map_err(|e| AppError::Internal(format!("Session write failed: {e}")))?;
        tracing::debug!(visitor_id = %visitor.id, "New visitor");

        Ok(Self(visitor.id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn cookies(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_request_locale_defaults() {
        let RequestLocale(config) = RequestLocale::from_headers(&HeaderMap::new());
        assert_eq!(config, LocaleConfig::default());
        assert_eq!(config.currency, CurrencyCode::Eur);
    }

    #[test]
    fn test_request_locale_currency_follows_country() {
        let RequestLocale(config) =
            RequestLocale::from_headers(&cookies("lvq_country=GB; lvq_language=EN"));
        assert_eq!(config.country, CountryCode::Gb);
        assert_eq!(config.language, LanguageCode::En);
        assert_eq!(config.currency, CurrencyCode::Gbp);
    }

    #[test]
    fn test_request_locale_currency_cookie_wins() {
        let RequestLocale(config) =
            RequestLocale::from_headers(&cookies("lvq_country=US; lvq_currency=EUR"));
        assert_eq!(config.country, CountryCode::Us);
        assert_eq!(config.currency, CurrencyCode::Eur);
    }

    #[test]
    fn test_request_locale_currency_from_browser() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        let RequestLocale(config) = RequestLocale::from_headers(&headers);
        assert_eq!(config.country, CountryCode::Nl);
        assert_eq!(config.currency, CurrencyCode::Usd);

        headers.insert(header::COOKIE, HeaderValue::from_static("lvq_country=DE"));
        let RequestLocale(config) = RequestLocale::from_headers(&headers);
        assert_eq!(config.currency, CurrencyCode::Eur);
    }

    #[test]
    fn test_request_locale_ignores_unknown_values() {
        let RequestLocale(config) =
            RequestLocale::from_headers(&cookies("lvq_country=XX; lvq_language=JP"));
        assert_eq!(config.country, CountryCode::Nl);
        assert_eq!(config.language, LanguageCode::Nl);
    }
}
