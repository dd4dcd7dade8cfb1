//! Promo capture and locale routing middleware.
//!
//! Every page lives under a site locale prefix (`/nl/...`, `/en/...`).
//! Requests without one are redirected to the shopper's preferred locale.
//! A `?promo=CODE` query parameter on any page is remembered in a cookie so
//! the discount follows the shopper through the site.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::cookie::{Cookie, SameSite, time::Duration};

use lavistique_core::SiteLocale;

/// Cookie holding the active promo code.
pub const PROMO_COOKIE: &str = "lvq_promo";

/// Cookie holding the last visited site locale.
pub const LOCALE_COOKIE: &str = "lvq_locale";

/// Cookies holding the shopper's shopping locale.
pub const COUNTRY_COOKIE: &str = "lvq_country";
pub const LANGUAGE_COOKIE: &str = "lvq_language";
pub const CURRENCY_COOKIE: &str = "lvq_currency";

const PROMO_MAX_AGE_DAYS: i64 = 30;

/// Longest promo code accepted from a URL or cookie.
pub const MAX_PROMO_CODE_LEN: usize = 64;
const LOCALE_MAX_AGE_DAYS: i64 = 365;

/// Locale used when neither cookie nor browser says otherwise.
pub const FALLBACK_LOCALE: SiteLocale = SiteLocale::En;

/// Path prefixes served without a locale prefix.
const UNPREFIXED_PATHS: &[&str] = &[
    "/api",
    "/static",
    "/health",
    "/favicon.ico",
    "/robots.txt",
    "/sitemap.xml",
];

// =============================================================================
// Cookie helpers
// =============================================================================

/// Read a cookie value from the request headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// A site-wide `SameSite=Lax` cookie.
#[must_use]
pub fn site_cookie(name: &'static str, value: String, max_age_days: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .max_age(Duration::days(max_age_days))
        .same_site(SameSite::Lax)
        .build()
}

/// Normalize a promo code, or `None` unless it is 1-64 of `A-Z 0-9 _ -`.
///
/// Anything else could carry cookie attributes into `Set-Cookie`.
#[must_use]
pub fn promo_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = (1..=MAX_PROMO_CODE_LEN).contains(&code.len())
        && code
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    valid.then_some(code)
}

/// Cookie remembering a promo code for 30 days; `None` for an invalid code.
#[must_use]
pub fn promo_cookie(code: &str) -> Option<Cookie<'static>> {
    promo_code(code).map(|code| site_cookie(PROMO_COOKIE, code, PROMO_MAX_AGE_DAYS))
}

/// Cookie remembering the site locale for a year.
#[must_use]
pub fn locale_cookie(locale: SiteLocale) -> Cookie<'static> {
    site_cookie(LOCALE_COOKIE, locale.as_str().to_string(), LOCALE_MAX_AGE_DAYS)
}

/// Cookie that deletes `name` on the client.
#[must_use]
pub fn expired_cookie(name: &'static str) -> Cookie<'static> {
    site_cookie(name, String::new(), 0)
}

/// Append a `Set-Cookie` header to a response.
pub fn set_cookie(response: &mut Response, cookie: &Cookie<'_>) {
    if let Ok(value) = HeaderValue::from_str(&cookie.to_string()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}

// =============================================================================
// Locale detection
// =============================================================================

/// Whether a path is served without locale routing.
#[must_use]
pub fn is_unprefixed(path: &str) -> bool {
    UNPREFIXED_PATHS.iter().any(|prefix| path.starts_with(prefix))
}

/// Site locale named by the first path segment, if any.
#[must_use]
pub fn path_locale(path: &str) -> Option<SiteLocale> {
    path.trim_start_matches('/')
        .split('/')
        .next()
        .and_then(SiteLocale::parse)
}

/// Primary language of an `Accept-Language` header (`de-DE,de;q=0.9` -> `de`).
#[must_use]
pub fn primary_language(accept_language: &str) -> Option<SiteLocale> {
    accept_language
        .split(',')
        .next()
        .and_then(|tag| tag.split(';').next())
        .and_then(|tag| tag.trim().split('-').next())
        .and_then(SiteLocale::parse)
}

/// Preferred site locale: locale cookie, then browser language, then English.
#[must_use]
pub fn preferred_locale(headers: &HeaderMap) -> SiteLocale {
    read_cookie(headers, LOCALE_COOKIE)
        .as_deref()
        .and_then(SiteLocale::parse)
        .or_else(|| {
            headers
                .get(header::ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok())
                .and_then(primary_language)
        })
        .unwrap_or(FALLBACK_LOCALE)
}

/// `promo` query parameter, if present and non-empty.
#[must_use]
pub fn promo_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "promo")
        .and_then(|(_, value)| promo_code(&value))
}

/// `/{locale}{path}?{query}`
#[must_use]
pub fn localized_path(locale: SiteLocale, path: &str, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("/{locale}{path}?{query}"),
        None => format!("/{locale}{path}"),
    }
}

// =============================================================================
// Middleware
// =============================================================================

/// Capture `?promo=` and route pages under a locale prefix.
pub async fn locale_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    if is_unprefixed(&path) {
        return next.run(request).await;
    }

    let query = request.uri().query().map(str::to_owned);
    let promo = promo_param(query.as_deref());

    let (mut response, locale) = match path_locale(&path) {
        Some(locale) => (next.run(request).await, locale),
        None => {
            let locale = preferred_locale(request.headers());
            let target = localized_path(locale, &path, query.as_deref());
            tracing::debug!(from = %path, to = %target, "Redirecting to localized path");
            (Redirect::temporary(&target).into_response(), locale)
        }
    };

    set_cookie(&mut response, &locale_cookie(locale));
    if let Some(cookie) = promo.as_deref().and_then(promo_cookie) {
        tracing::debug!(promo = %cookie.value(), "Promo code captured from URL");
        set_cookie(&mut response, &cookie);
    }

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_read_cookie() {
        let h = headers(&[(header::COOKIE, "lvq_locale=de; lvq_promo=SUMMER20")]);
        assert_eq!(read_cookie(&h, PROMO_COOKIE).as_deref(), Some("SUMMER20"));
        assert_eq!(read_cookie(&h, LOCALE_COOKIE).as_deref(), Some("de"));
        assert!(read_cookie(&h, CURRENCY_COOKIE).is_none());
    }

    #[test]
    fn test_read_cookie_across_headers_and_empty_values() {
        let h = headers(&[
            (header::COOKIE, "a=1"),
            (header::COOKIE, "lvq_promo=; lvq_country=GB"),
        ]);
        assert!(read_cookie(&h, PROMO_COOKIE).is_none());
        assert_eq!(read_cookie(&h, COUNTRY_COOKIE).as_deref(), Some("GB"));
    }

    #[test]
    fn test_promo_cookie_attributes() {
        let cookie = promo_cookie(" summer20 ").unwrap().to_string();
        assert!(cookie.starts_with("lvq_promo=SUMMER20"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(cookie.contains("SameSite=Lax"));
    }

    #[test]
    fn test_locale_cookie_lasts_a_year() {
        let cookie = locale_cookie(SiteLocale::Fr).to_string();
        assert!(cookie.starts_with("lvq_locale=fr"));
        assert!(cookie.contains("Max-Age=31536000"));
    }

    #[test]
    fn test_unprefixed_paths() {
        assert!(is_unprefixed("/api/cart"));
        assert!(is_unprefixed("/static/css/main.css"));
        assert!(is_unprefixed("/health/ready"));
        assert!(is_unprefixed("/robots.txt"));
        assert!(!is_unprefixed("/products/royal-portrait"));
        assert!(!is_unprefixed("/"));
    }

    #[test]
    fn test_path_locale() {
        assert_eq!(path_locale("/de/products/x"), Some(SiteLocale::De));
        assert_eq!(path_locale("/nl"), Some(SiteLocale::Nl));
        assert_eq!(path_locale("/products/x"), None);
        assert_eq!(path_locale("/"), None);
    }

    #[test]
    fn test_primary_language() {
        assert_eq!(primary_language("de-DE,de;q=0.9,en;q=0.8"), Some(SiteLocale::De));
        assert_eq!(primary_language("fr;q=0.9"), Some(SiteLocale::Fr));
        assert_eq!(primary_language("es-ES,nl;q=0.5"), None);
        assert_eq!(primary_language(""), None);
    }

    #[test]
    fn test_preferred_locale_order() {
        let cookie_wins = headers(&[
            (header::COOKIE, "lvq_locale=fr"),
            (header::ACCEPT_LANGUAGE, "de-DE"),
        ]);
        assert_eq!(preferred_locale(&cookie_wins), SiteLocale::Fr);

        let browser = headers(&[(header::ACCEPT_LANGUAGE, "nl-BE,nl;q=0.9")]);
        assert_eq!(preferred_locale(&browser), SiteLocale::Nl);

        let unsupported = headers(&[(header::ACCEPT_LANGUAGE, "es-ES")]);
        assert_eq!(preferred_locale(&unsupported), SiteLocale::En);

        assert_eq!(preferred_locale(&HeaderMap::new()), SiteLocale::En);
    }

    #[test]
    fn test_promo_param() {
        assert_eq!(promo_param(Some("promo=summer20&x=1")).as_deref(), Some("SUMMER20"));
        assert_eq!(promo_param(Some("x=1")), None);
        assert_eq!(promo_param(Some("promo=")), None);
        assert_eq!(promo_param(None), None);
    }

    #[test]
    fn test_promo_code_rejects_cookie_attributes() {
        assert_eq!(
            promo_param(Some("promo=x%3B%20Domain%3Devil.example%3B%20Max-Age%3D99999999")),
            None
        );
        assert!(promo_cookie("x; Domain=evil.example").is_none());
        assert!(promo_cookie("a=b").is_none());
        assert!(promo_cookie(&"A".repeat(MAX_PROMO_CODE_LEN + 1)).is_none());
        assert_eq!(promo_code(" black-friday_24 ").as_deref(), Some("BLACK-FRIDAY_24"));
    }

    #[test]
    fn test_localized_path() {
        assert_eq!(localized_path(SiteLocale::En, "/", None), "/en/");
        assert_eq!(
            localized_path(SiteLocale::De, "/products/royal", Some("promo=X")),
            "/de/products/royal?promo=X"
        );
        assert_eq!(localized_path(SiteLocale::Nl, "/cart", Some("")), "/nl/cart");
    }
}
