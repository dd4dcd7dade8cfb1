//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame and isolation policies)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Promo capture and locale routing
//! 7. Rate limiting on API routes (governor)
//!
//! Extractors: [`RequestLocale`], [`ActivePromo`], [`Visitor`] and
//! [`RequireStaff`].

pub mod context;
pub mod locale;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod staff;

pub use context::{ActivePromo, RequestLocale, Visitor};
pub use locale::locale_middleware;
pub use rate_limit::{api_rate_limiter, chat_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
pub use staff::RequireStaff;
