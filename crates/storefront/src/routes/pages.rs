//! Server-rendered pages under a `/{locale}` prefix.
//!
//! The prefix picks the page language; country and currency come from the
//! shopper's locale cookies. Product cards show the active promo price when
//! the promo applies to the product.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tower_sessions::Session;
use tracing::instrument;

use lavistique_core::discount::{DiscountRule, calculate_discount};
use lavistique_core::wizard::{ATTR_COSTUME, ATTR_FRAME, WizardOptions};
use lavistique_core::{Locale, LocaleConfig, SiteLocale, format_price};

use crate::db::DiscountRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::{ActivePromo, RequestLocale};
use crate::routes::cart::session_cart_id;
use crate::shopify::types::{Cart, Collection, Money, Product, ProductSummary};
use crate::state::AppState;

/// Number of products on the home page grid.
const HOME_PRODUCT_COUNT: i64 = 24;

// =============================================================================
// View Models
// =============================================================================

/// Data every page layout needs.
#[derive(Clone)]
pub struct PageContext {
    pub site_locale: SiteLocale,
    pub locale: LocaleConfig,
    pub promo: Option<String>,
    pub locales: [SiteLocale; 4],
}

impl PageContext {
    fn new(
        site_locale: SiteLocale,
        RequestLocale(locale): RequestLocale,
        promo: Option<String>,
    ) -> Self {
        Self {
            site_locale,
            locale,
            promo,
            locales: SiteLocale::ALL,
        }
    }

    /// Storefront API locale: cookie country, prefix language.
    const fn api_locale(&self) -> Locale {
        Locale::new(self.locale.country, self.site_locale.language())
    }

    /// Format an amount in the shopper's display currency.
    pub fn price(&self, amount: Decimal) -> String {
        format_price(amount, self.locale.currency)
    }
}

/// A product card with its promo price, if any.
#[derive(Clone)]
pub struct ProductCard {
    pub product: ProductSummary,
    pub price: String,
    pub sale_price: Option<String>,
}

impl ProductCard {
    fn new(product: ProductSummary, promo: Option<&DiscountRule>) -> Self {
        let money = &product.price_range.min_variant_price;
        Self {
            price: money.display(),
            sale_price: promo_price(promo, money, &product.id, &product.collection_ids),
            product,
        }
    }
}

/// Discounted display price when `rule` applies to the product.
fn promo_price(
    rule: Option<&DiscountRule>,
    money: &Money,
    product_id: &str,
    collection_ids: &[String],
) -> Option<String> {
    let cents = (money.amount * Decimal::ONE_HUNDRED).round().to_i64()?;
    let calculation = calculate_discount(rule, cents, product_id, collection_ids);
    calculation.qualifies.then(|| {
        Money {
            amount: Decimal::new(calculation.discounted, 2),
            currency_code: money.currency_code.clone(),
        }
        .display()
    })
}

/// Cart line display data.
pub struct CartLineView {
    pub title: String,
    pub handle: String,
    pub variant: Option<String>,
    pub quantity: i64,
    pub total: String,
    pub image_url: Option<String>,
    pub costume: Option<String>,
    pub frame: Option<String>,
}

/// Cart display data.
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub subtotal: String,
    pub total: String,
    pub checkout_url: String,
    pub discount_codes: Vec<String>,
    pub has_skip_the_line: bool,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart
                .lines
                .iter()
                .map(|line| CartLineView {
                    title: line.merchandise.product.title.clone(),
                    handle: line.merchandise.product.handle.clone(),
                    variant: (line.merchandise.title != "Default Title")
                        .then(|| line.merchandise.title.clone()),
                    quantity: line.quantity,
                    total: line.total_amount.display(),
                    image_url: line
                        .merchandise
                        .image
                        .as_ref()
                        .or(line.merchandise.product.featured_image.as_ref())
                        .map(|img| img.url.clone()),
                    costume: line.attribute(ATTR_COSTUME).map(str::to_string),
                    frame: line.attribute(ATTR_FRAME).map(str::to_string),
                })
                .collect(),
            subtotal: cart.cost.subtotal.display(),
            total: cart.cost.total.display(),
            checkout_url: cart.checkout_url.clone(),
            discount_codes: cart
                .discount_codes
                .iter()
                .filter(|c| c.applicable)
                .map(|c| c.code.clone())
                .collect(),
            has_skip_the_line: cart.has_skip_the_line(),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCard>,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/product.html")]
pub struct ProductTemplate {
    pub page: PageContext,
    pub product: Product,
    pub price: String,
    pub sale_price: Option<String>,
    pub options: WizardOptions,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/collection.html")]
pub struct CollectionTemplate {
    pub page: PageContext,
    pub collection: Collection,
    pub products: Vec<ProductCard>,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/cart.html")]
pub struct CartTemplate {
    pub page: PageContext,
    pub cart: Option<CartView>,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/error.html")]
pub struct ErrorTemplate {
    pub page: PageContext,
    pub status: u16,
    pub message: String,
}

/// Render an error page with the error's status.
fn error_page(page: PageContext, err: &AppError) -> Response {
    let status = err.status();
    if status.is_server_error() {
        tracing::error!(error = %err, "Page render failed");
    }
    let message = if status == StatusCode::NOT_FOUND {
        "We couldn't find that page.".to_string()
    } else {
        "Something went wrong. Please try again.".to_string()
    };

    (
        status,
        ErrorTemplate {
            page,
            status: status.as_u16(),
            message,
        },
    )
        .into_response()
}

/// Site locale from the path prefix, or a 404.
fn site_locale(segment: &str) -> Result<SiteLocale, AppError> {
    SiteLocale::parse(segment)
        .ok_or_else(|| AppError::NotFound(format!("Unknown locale: {segment}")))
}

/// The promo rule behind the shopper's active code, when redeemable.
async fn active_rule(state: &AppState, promo: Option<&str>) -> Option<DiscountRule> {
    let code = promo?;
    match DiscountRepository::new(state.pool()).find_by_code(code).await {
        Ok(rule) => rule.filter(|r| r.is_redeemable(Utc::now())),
        Err(e) => {
            tracing::warn!(error = %e, %code, "Promo lookup failed");
            None
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /{locale}/`
#[instrument(skip(state))]
pub async fn home(
    State(state): State<AppState>,
    Path(locale): Path<String>,
    request_locale: RequestLocale,
    ActivePromo(promo): ActivePromo,
) -> Response {
    let site = match site_locale(&locale) {
        Ok(site) => site,
        Err(e) => {
            return error_page(
                PageContext::new(SiteLocale::DEFAULT, request_locale, promo),
                &e,
            );
        }
    };
    let page = PageContext::new(site, request_locale, promo);

    let products = match state
        .storefront()
        .get_products(Some(HOME_PRODUCT_COUNT), None, page.api_locale())
        .await
    {
        Ok(connection) => connection.products,
        Err(e) => return error_page(page, &AppError::from(e)),
    };
    let rule = active_rule(&state, page.promo.as_deref()).await;

    HomeTemplate {
        products: products
            .into_iter()
            .map(|p| ProductCard::new(p, rule.as_ref()))
            .collect(),
        page,
    }
    .into_response()
}

/// `GET /{locale}/products/{handle}`
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path((locale, handle)): Path<(String, String)>,
    request_locale: RequestLocale,
    ActivePromo(promo): ActivePromo,
) -> Response {
    let site = match site_locale(&locale) {
        Ok(site) => site,
        Err(e) => {
            return error_page(
                PageContext::new(SiteLocale::DEFAULT, request_locale, promo),
                &e,
            );
        }
    };
    let page = PageContext::new(site, request_locale, promo);

    let product = match state
        .storefront()
        .get_product_by_handle(&handle, page.api_locale())
        .await
    {
        Ok(product) => product,
        Err(e) => return error_page(page, &AppError::from(e)),
    };
    let rule = active_rule(&state, page.promo.as_deref()).await;
    let money = &product.price_range.min_variant_price;

    ProductTemplate {
        price: money.display(),
        sale_price: promo_price(rule.as_ref(), money, &product.id, &product.collection_ids()),
        options: state.wizard_options().clone(),
        product,
        page,
    }
    .into_response()
}

/// `GET /{locale}/collections/{handle}`
#[instrument(skip(state))]
pub async fn collection(
    State(state): State<AppState>,
    Path((locale, handle)): Path<(String, String)>,
    request_locale: RequestLocale,
    ActivePromo(promo): ActivePromo,
) -> Response {
    let site = match site_locale(&locale) {
        Ok(site) => site,
        Err(e) => {
            return error_page(
                PageContext::new(SiteLocale::DEFAULT, request_locale, promo),
                &e,
            );
        }
    };
    let page = PageContext::new(site, request_locale, promo);

    let mut collection = match state
        .storefront()
        .get_collection_by_handle(&handle, None, None, page.api_locale())
        .await
    {
        Ok(collection) => collection,
        Err(e) => return error_page(page, &AppError::from(e)),
    };
    let rule = active_rule(&state, page.promo.as_deref()).await;
    let products = std::mem::take(&mut collection.products)
        .into_iter()
        .map(|p| ProductCard::new(p, rule.as_ref()))
        .collect();

    CollectionTemplate {
        page,
        collection,
        products,
    }
    .into_response()
}

/// `GET /{locale}/cart`
#[instrument(skip(state, session))]
pub async fn cart(
    State(state): State<AppState>,
    session: Session,
    Path(locale): Path<String>,
    request_locale: RequestLocale,
    ActivePromo(promo): ActivePromo,
) -> Response {
    let site = match site_locale(&locale) {
        Ok(site) => site,
        Err(e) => {
            return error_page(
                PageContext::new(SiteLocale::DEFAULT, request_locale, promo),
                &e,
            );
        }
    };
    let page = PageContext::new(site, request_locale, promo);

    let cart = match session_cart_id(&session).await {
        Ok(Some(cart_id)) => match state.storefront().get_cart(&cart_id, page.api_locale()).await {
            Ok(cart) => cart.as_ref().map(CartView::from),
            Err(e) => {
                tracing::warn!(%cart_id, error = %e, "Failed to fetch cart");
                None
            }
        },
        Ok(None) => None,
        Err(e) => return error_page(page, &e),
    };

    CartTemplate { page, cart }.into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lavistique_core::{DiscountKind, DiscountRuleId, DiscountScope};

    use super::*;

    fn rule(kind: DiscountKind, value: i64, scope: DiscountScope) -> DiscountRule {
        DiscountRule {
            id: DiscountRuleId::new(),
            shopify_discount_id: None,
            code: "SPRING".to_string(),
            title: "Spring".to_string(),
            kind,
            value,
            scope,
            target_ids: Some(vec!["gid://shopify/Collection/1".to_string()]),
            target_name: None,
            minimum_purchase: None,
            usage_limit: None,
            usage_count: 0,
            starts_at: None,
            ends_at: None,
            is_active: true,
            synced_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn eur(amount: i64) -> Money {
        Money {
            amount: Decimal::new(amount, 2),
            currency_code: "EUR".to_string(),
        }
    }

    #[test]
    fn test_promo_price_percentage() {
        let rule = rule(DiscountKind::Percentage, 20, DiscountScope::All);
        let price = promo_price(Some(&rule), &eur(7999), "p", &[]);
        assert_eq!(price.as_deref(), Some("€ 63,99"));
    }

    #[test]
    fn test_promo_price_needs_matching_collection() {
        let rule = rule(DiscountKind::FixedAmount, 1000, DiscountScope::Collection);
        assert!(promo_price(Some(&rule), &eur(5999), "p", &[]).is_none());

        let collections = vec!["gid://shopify/Collection/1".to_string()];
        let price = promo_price(Some(&rule), &eur(5999), "p", &collections);
        assert_eq!(price.as_deref(), Some("€ 49,99"));
    }

    #[test]
    fn test_no_promo_no_sale_price() {
        assert!(promo_price(None, &eur(5999), "p", &[]).is_none());
    }

    #[test]
    fn test_site_locale_segment() {
        assert_eq!(site_locale("de").unwrap(), SiteLocale::De);
        assert!(site_locale("xx").is_err());
    }
}
