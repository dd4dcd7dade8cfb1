//! Core types for the La Vistique storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod locale;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use locale::{
    CountryCode, CurrencyCode, LanguageCode, Locale, LocaleConfig, SiteLocale, detect_currency,
};
pub use price::{Price, format_price};
pub use status::*;
