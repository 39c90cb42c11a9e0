//! Axum extractors for authentication.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::errors::{AuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use crate::db::Profile;
use crate::jwt::JwtError;

/// Extract the access token from a request: prefer an
/// `Authorization: Bearer <token>` header, fall back to the access cookie.
pub fn extract_access_token<'a>(headers: &'a HeaderMap) -> Option<&'a str> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim());
            }
        }
    }
    get_cookie(headers, ACCESS_COOKIE_NAME)
}

/// Core gate logic shared by the extractors: extract, verify, load user.
async fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<Profile, AuthErrorKind>
where
    S: HasAuthBackend + Send + Sync,
{
    let token = extract_access_token(&parts.headers).ok_or(AuthErrorKind::NoToken)?;

    let claims = state.jwt().validate_access_token(token).map_err(|e| match e {
        JwtError::Expired => AuthErrorKind::Expired,
        JwtError::NotYetValid => AuthErrorKind::NotYetValid,
        _ => AuthErrorKind::Invalid,
    })?;

    // Load only non-sensitive fields, never the password hash.
    let profile = state
        .db()
        .users()
        .get_profile(claims.sub)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load user for auth");
            AuthErrorKind::Backend
        })?
        .ok_or(AuthErrorKind::UserNotFound)?;

    Ok(profile)
}

/// Extractor for endpoints that require authentication.
/// Carries the authenticated user's non-sensitive profile.
pub struct Auth(pub Profile);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .await
            .map(Auth)
            .map_err(AuthError::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_header_preferred_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header-token"),
        );
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("accessToken=cookie-token"),
        );

        assert_eq!(extract_access_token(&headers), Some("header-token"));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("accessToken=cookie-token"),
        );

        assert_eq!(extract_access_token(&headers), Some("cookie-token"));
    }

    #[test]
    fn test_non_bearer_authorization_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic dXNlcjpwYXNz"),
        );

        assert_eq!(extract_access_token(&headers), None);
    }

    #[test]
    fn test_no_token_sources() {
        assert_eq!(extract_access_token(&HeaderMap::new()), None);
    }
}
