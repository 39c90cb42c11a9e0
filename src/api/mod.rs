mod error;
mod tokens;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ResultExt};

/// Create the API router.
pub fn create_api_router(db: Database, jwt: Arc<JwtConfig>, secure_cookies: bool) -> Router {
    let rate_limits = Arc::new(RateLimitConfig::new());

    let users_state = users::UsersState {
        db: db.clone(),
        jwt: jwt.clone(),
        secure_cookies,
        rate_limits: rate_limits.clone(),
    };

    let tokens_state = tokens::TokensState {
        db,
        jwt,
        secure_cookies,
        rate_limits,
    };

    Router::new()
        .merge(users::router(users_state))
        .merge(tokens::router(tokens_state))
}
