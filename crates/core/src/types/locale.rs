//! Shopping locale: country, language, and display currency.
//!
//! Country and language codes are the values the Storefront API accepts in
//! its `@inContext` directive. [`SiteLocale`] is the lowercase URL prefix used
//! for page routing (`/nl/...`, `/en/...`).

use serde::{Deserialize, Serialize};

use super::status::ParseStatusError;

/// Countries the store ships to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CountryCode {
    #[default]
    Nl,
    De,
    Fr,
    Be,
    Gb,
    Us,
    At,
    It,
    Es,
    Pt,
    Ie,
    Lu,
}

impl CountryCode {
    /// Every supported country, in selector order.
    pub const ALL: [Self; 12] = [
        Self::Nl,
        Self::De,
        Self::Fr,
        Self::Be,
        Self::Gb,
        Self::Us,
        Self::At,
        Self::It,
        Self::Es,
        Self::Pt,
        Self::Ie,
        Self::Lu,
    ];

    /// ISO 3166-1 alpha-2 code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nl => "NL",
            Self::De => "DE",
            Self::Fr => "FR",
            Self::Be => "BE",
            Self::Gb => "GB",
            Self::Us => "US",
            Self::At => "AT",
            Self::It => "IT",
            Self::Es => "ES",
            Self::Pt => "PT",
            Self::Ie => "IE",
            Self::Lu => "LU",
        }
    }

    /// English display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Nl => "Netherlands",
            Self::De => "Germany",
            Self::Fr => "France",
            Self::Be => "Belgium",
            Self::Gb => "United Kingdom",
            Self::Us => "United States",
            Self::At => "Austria",
            Self::It => "Italy",
            Self::Es => "Spain",
            Self::Pt => "Portugal",
            Self::Ie => "Ireland",
            Self::Lu => "Luxembourg",
        }
    }

    /// Default currency for shoppers in this country.
    #[must_use]
    pub const fn currency(self) -> CurrencyCode {
        match self {
            Self::Gb => CurrencyCode::Gbp,
            Self::Us => CurrencyCode::Usd,
            _ => CurrencyCode::Eur,
        }
    }

    /// Site locale (URL prefix) shoppers from this country land on.
    #[must_use]
    pub const fn site_locale(self) -> SiteLocale {
        match self {
            Self::Nl | Self::Be => SiteLocale::Nl,
            Self::De | Self::At => SiteLocale::De,
            Self::Fr | Self::Lu => SiteLocale::Fr,
            Self::Gb | Self::Ie | Self::Us => SiteLocale::En,
            _ => SiteLocale::DEFAULT,
        }
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CountryCode {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError {
                kind: "country code",
                value: s.to_string(),
            })
    }
}

/// Storefront content languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LanguageCode {
    #[default]
    Nl,
    En,
    De,
    Fr,
}

impl LanguageCode {
    /// Every supported language, in selector order.
    pub const ALL: [Self; 4] = [Self::Nl, Self::En, Self::De, Self::Fr];

    /// Uppercase language code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nl => "NL",
            Self::En => "EN",
            Self::De => "DE",
            Self::Fr => "FR",
        }
    }

    /// Name of the language in that language.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Nl => "Nederlands",
            Self::En => "English",
            Self::De => "Deutsch",
            Self::Fr => "Français",
        }
    }
}

impl std::fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LanguageCode {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError {
                kind: "language code",
                value: s.to_string(),
            })
    }
}

/// Display currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    #[default]
    Eur,
    Gbp,
    Usd,
}

impl CurrencyCode {
    /// Every supported currency, in selector order.
    pub const ALL: [Self; 3] = [Self::Eur, Self::Gbp, Self::Usd];

    /// ISO 4217 code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Usd => "USD",
        }
    }

    /// Currency symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eur => "€",
            Self::Gbp => "£",
            Self::Usd => "$",
        }
    }

    /// English display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Eur => "Euro",
            Self::Gbp => "British Pound",
            Self::Usd => "US Dollar",
        }
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStatusError {
                kind: "currency code",
                value: s.to_string(),
            })
    }
}

/// Guess the display currency from a browser locale tag such as `en-US`.
///
/// US visitors get USD; everyone else gets EUR.
#[must_use]
pub fn detect_currency(browser_locale: &str) -> CurrencyCode {
    let tag = browser_locale.trim();
    let region_us = tag
        .len()
        .checked_sub(3)
        .and_then(|start| tag.get(start..))
        .is_some_and(|suffix| suffix.eq_ignore_ascii_case("-US"));
    if region_us {
        CurrencyCode::Usd
    } else {
        CurrencyCode::Eur
    }
}

/// Locale sent to the Storefront API with every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Locale {
    pub country: CountryCode,
    pub language: LanguageCode,
}

impl Locale {
    #[must_use]
    pub const fn new(country: CountryCode, language: LanguageCode) -> Self {
        Self { country, language }
    }
}

/// A shopper's full locale preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LocaleConfig {
    pub country: CountryCode,
    pub language: LanguageCode,
    pub currency: CurrencyCode,
}

impl LocaleConfig {
    /// Change the country; the currency follows the country.
    pub const fn set_country(&mut self, country: CountryCode) {
        self.country = country;
        self.currency = country.currency();
    }

    pub const fn set_language(&mut self, language: LanguageCode) {
        self.language = language;
    }

    pub const fn set_currency(&mut self, currency: CurrencyCode) {
        self.currency = currency;
    }

    /// The part of the preference the Storefront API cares about.
    #[must_use]
    pub const fn locale(&self) -> Locale {
        Locale::new(self.country, self.language)
    }
}

/// Lowercase URL prefix for localized pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteLocale {
    Nl,
    En,
    De,
    Fr,
}

impl SiteLocale {
    /// Locale for shoppers we know nothing about.
    pub const DEFAULT: Self = Self::Nl;

    /// Every supported prefix.
    pub const ALL: [Self; 4] = [Self::Nl, Self::En, Self::De, Self::Fr];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nl => "nl",
            Self::En => "en",
            Self::De => "de",
            Self::Fr => "fr",
        }
    }

    /// Parse a URL segment or language tag prefix (`"de"`, `"DE"`).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
    }

    /// Storefront API language for pages under this prefix.
    #[must_use]
    pub const fn language(self) -> LanguageCode {
        match self {
            Self::Nl => LanguageCode::Nl,
            Self::En => LanguageCode::En,
            Self::De => LanguageCode::De,
            Self::Fr => LanguageCode::Fr,
        }
    }

    /// Name of the locale in its own language.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        self.language().display_name()
    }
}

impl std::fmt::Display for SiteLocale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_country_currency_map() {
        assert_eq!(CountryCode::Gb.currency(), CurrencyCode::Gbp);
        assert_eq!(CountryCode::Us.currency(), CurrencyCode::Usd);
        for country in CountryCode::ALL {
            if !matches!(country, CountryCode::Gb | CountryCode::Us) {
                assert_eq!(country.currency(), CurrencyCode::Eur, "{country}");
            }
        }
    }

    #[test]
    fn test_country_site_locale() {
        assert_eq!(CountryCode::Be.site_locale(), SiteLocale::Nl);
        assert_eq!(CountryCode::At.site_locale(), SiteLocale::De);
        assert_eq!(CountryCode::Lu.site_locale(), SiteLocale::Fr);
        assert_eq!(CountryCode::Ie.site_locale(), SiteLocale::En);
        assert_eq!(CountryCode::Es.site_locale(), SiteLocale::Nl);
    }

    #[test]
    fn test_set_country_updates_currency() {
        let mut config = LocaleConfig::default();
        assert_eq!(config.currency, CurrencyCode::Eur);

        config.set_country(CountryCode::Us);
        assert_eq!(config.currency, CurrencyCode::Usd);

        config.set_currency(CurrencyCode::Eur);
        config.set_language(LanguageCode::En);
        assert_eq!(config.currency, CurrencyCode::Eur);
        assert_eq!(config.locale(), Locale::new(CountryCode::Us, LanguageCode::En));
    }

    #[test]
    fn test_detect_currency() {
        assert_eq!(detect_currency("en-US"), CurrencyCode::Usd);
        assert_eq!(detect_currency("es-US"), CurrencyCode::Usd);
        assert_eq!(detect_currency("en-GB"), CurrencyCode::Eur);
        assert_eq!(detect_currency("nl-NL"), CurrencyCode::Eur);
        assert_eq!(detect_currency("US"), CurrencyCode::Eur);
        assert_eq!(detect_currency(""), CurrencyCode::Eur);
    }

    #[test]
    fn test_codes_parse_case_insensitively() {
        assert_eq!("gb".parse::<CountryCode>().unwrap(), CountryCode::Gb);
        assert_eq!("En".parse::<LanguageCode>().unwrap(), LanguageCode::En);
        assert_eq!("usd".parse::<CurrencyCode>().unwrap(), CurrencyCode::Usd);
        assert!("CH".parse::<CountryCode>().is_err());
    }

    #[test]
    fn test_serde_codes_are_uppercase() {
        let json = serde_json::to_string(&Locale::default()).unwrap();
        assert_eq!(json, r#"{"country":"NL","language":"NL"}"#);
    }

    #[test]
    fn test_site_locale_parse() {
        assert_eq!(SiteLocale::parse("de"), Some(SiteLocale::De));
        assert_eq!(SiteLocale::parse("FR"), Some(SiteLocale::Fr));
        assert_eq!(SiteLocale::parse("es"), None);
        assert_eq!(SiteLocale::En.language(), LanguageCode::En);
    }
}
