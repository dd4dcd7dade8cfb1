//! Staff authentication for support and CRM management routes.
//!
//! Staff send `Authorization: Bearer <ADMIN_PASSWORD>`. Without a configured
//! password every staff route answers 401.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use secrecy::ExposeSecret;

use crate::error::AppError;
use crate::state::AppState;

/// Extractor that requires a valid staff bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn pending_tickets(_staff: RequireStaff, State(state): State<AppState>) { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RequireStaff;

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config().admin_password.as_ref() else {
            tracing::warn!("Staff route requested but ADMIN_PASSWORD is not configured");
            return Err(AppError::Unauthorized("Staff access is disabled".to_string()));
        };

        let provided = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        if constant_time_eq(provided.as_bytes(), expected.expose_secret().as_bytes()) {
            Ok(Self)
        } else {
            tracing::warn!(path = %parts.uri.path(), "Rejected staff credentials");
            Err(AppError::Unauthorized("Invalid credentials".to_string()))
        }
    }
}

/// Token from an `Authorization: Bearer <token>` value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token("Bearer s3cret"), Some("s3cret"));
        assert_eq!(bearer_token("bearer   s3cret "), Some("s3cret"));
        assert_eq!(bearer_token("Basic s3cret"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("s3cret"), None);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
