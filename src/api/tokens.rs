//! Token refresh endpoint.
//!
//! POST `/refresh` - validate the presented refresh token against the
//! stored fingerprint and rotate both tokens.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::post,
};
use std::sync::Arc;
use tracing::{error, warn};

use super::error::ApiError;
use super::users::clear_session_cookies;
use crate::auth::{REFRESH_COOKIE_NAME, get_cookie};
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::password::fingerprint;
use crate::rate_limit::{RateLimitConfig, rate_limit_refresh};
use crate::session::issue_session;

#[derive(Clone)]
pub struct TokensState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
    pub rate_limits: Arc<RateLimitConfig>,
}

pub fn router(state: TokensState) -> Router {
    Router::new()
        .route("/refresh", post(refresh))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limits,
            rate_limit_refresh,
        ))
}

/// Taxonomy error with both token cookies cleared. Every failure past the
/// missing-cookie check degrades toward forced re-login rather than leaving
/// an ambiguous partial session.
fn reject(err: ApiError, secure: bool) -> Response {
    (clear_session_cookies(secure), err).into_response()
}

/// Rotate the access/refresh token pair.
///
/// The presented refresh token must verify against the refresh secret AND
/// its digest must equal the stored session fingerprint - only the latest
/// issued refresh token ever matches. A verified token with a stale digest
/// is treated as a possible theft signal: the stored fingerprint is nulled,
/// forcing a full re-login.
async fn refresh(State(state): State<TokensState>, headers: HeaderMap) -> Response {
    let secure = state.secure_cookies;

    // 1. No cookie: plain 401, nothing to clear.
    let Some(token) = get_cookie(&headers, REFRESH_COOKIE_NAME) else {
        return ApiError::authentication("Refresh token not found").into_response();
    };

    // 2. Signature/expiry check with the refresh secret.
    let claims = match state.jwt.validate_refresh_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(error = %e, "Rejected refresh token");
            return reject(
                ApiError::authorization("Invalid or expired refresh token"),
                secure,
            );
        }
    };

    // 3. The user must exist and have a live session.
    let user = match state.db.users().get_by_id(claims.sub).await {
        Ok(user) => user,
        Err(e) => {
            return reject(
                ApiError::persistence_error("Failed to load user for refresh", e),
                secure,
            );
        }
    };
    let Some(user) = user else {
        return reject(ApiError::authorization("Invalid refresh token"), secure);
    };
    let Some(stored) = user.session_fingerprint else {
        return reject(ApiError::authorization("Invalid refresh token"), secure);
    };

    // 4. Digest comparison against the stored fingerprint.
    if fingerprint(token) != stored {
        // A verified but rotated-out token: possible reuse/theft. Null the
        // slot so every outstanding refresh token dies with it.
        warn!(user_id = user.id, "Refresh token fingerprint mismatch; invalidating session");
        if let Err(e) = state.db.users().set_session_fingerprint(user.id, None).await {
            error!(error = %e, "Failed to invalidate session");
        }
        return reject(ApiError::authorization("Invalid refresh token"), secure);
    }

    // 5. Match: rotate both tokens.
    let session = match issue_session(&state.db, &state.jwt, user.id).await {
        Ok(session) => session,
        Err(e) => {
            return reject(
                ApiError::persistence_error("Failed to rotate session", e),
                secure,
            );
        }
    };

    (
        StatusCode::OK,
        super::users::session_cookies(&session, secure),
        Json(serde_json::json!({
            "message": "Tokens refreshed successfully",
            "user": {
                "id": user.id,
                "username": user.username,
                "name": user.name,
                "email": user.email,
            },
        })),
    )
        .into_response()
}
