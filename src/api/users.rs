//! User account endpoints: login, registration, logout, and profile.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::error::{ApiError, ResultExt};
use crate::auth::{
    ACCESS_COOKIE_NAME, Auth, REFRESH_COOKIE_NAME, build_cookie, clear_cookie,
};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::{hash_password, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_auth};
use crate::session::{IssuedSession, issue_session};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub secure_cookies: bool,
    pub rate_limits: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    let protected = Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(get_profile).put(update_profile))
        .with_state(state.clone());

    let public = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limits,
            rate_limit_auth,
        ));

    Router::new().merge(protected).merge(public)
}

/// Set-Cookie headers for a freshly issued session.
pub(super) fn session_cookies(
    session: &IssuedSession,
    secure: bool,
) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            build_cookie(
                ACCESS_COOKIE_NAME,
                &session.access_token,
                session.access_max_age,
                secure,
            ),
        ),
        (
            SET_COOKIE,
            build_cookie(
                REFRESH_COOKIE_NAME,
                &session.refresh_token,
                session.refresh_max_age,
                secure,
            ),
        ),
    ])
}

/// Set-Cookie headers clearing both token cookies.
pub(super) fn clear_session_cookies(
    secure: bool,
) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    AppendHeaders([
        (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, secure)),
        (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, secure)),
    ])
}

fn issue_err(e: crate::session::IssueError) -> ApiError {
    error!(error = %e, "Failed to issue session");
    ApiError::internal("Internal server error")
}

/// Reject with a 400 listing the missing fields, if any.
fn require_fields(fields: &[(&str, bool)]) -> Result<(), ApiError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(format!(
            "Please provide the following fields: {}",
            missing.join(", ")
        )))
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Login/register/refresh response body. Tokens travel only via cookies.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    id: i64,
    username: String,
    name: String,
    email: String,
    access_expires: DateTime<Utc>,
}

async fn login(
    State(state): State<UsersState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim().to_lowercase();
    let password = payload.password;

    require_fields(&[
        ("username", !username.is_empty()),
        ("password", !password.is_empty()),
    ])?;

    let user = state
        .db
        .users()
        .get_by_username(&username)
        .await
        .db_err("Failed to look up user")?;

    // Same generic message whether the username or the password was wrong.
    let Some(user) = user else {
        return Err(ApiError::authentication("Invalid username or password"));
    };
    if !verify_password(&password, &user.password_hash) {
        return Err(ApiError::authentication("Invalid username or password"));
    }

    let session = issue_session(&state.db, &state.jwt, user.id)
        .await
        .map_err(issue_err)?;

    let response = AuthResponse {
        id: user.id,
        username: user.username,
        name: user.name,
        email: user.email,
        access_expires: session.access_expires,
    };
    Ok((
        StatusCode::OK,
        session_cookies(&session, state.secure_cookies),
        Json(response),
    ))
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn register(
    State(state): State<UsersState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim().to_lowercase();
    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    let password = payload.password;

    require_fields(&[
        ("username", !username.is_empty()),
        ("name", !name.is_empty()),
        ("email", !email.is_empty()),
        ("password", !password.is_empty()),
    ])?;

    if password.chars().count() < 6 {
        return Err(ApiError::validation(
            "Password must be at least 6 characters long",
        ));
    }

    let taken = state
        .db
        .users()
        .username_or_email_taken(&username, &email)
        .await
        .db_err("Failed to check for existing user")?;
    if taken {
        return Err(ApiError::validation("User already exists"));
    }

    let password_hash = hash_password(&password)
        .map_err(|e| ApiError::persistence_error("Failed to hash password", e))?;

    let id = state
        .db
        .users()
        .create(&username, &name, &email, &password_hash)
        .await
        .db_err("Failed to create user")?;

    let session = issue_session(&state.db, &state.jwt, id)
        .await
        .map_err(issue_err)?;

    let response = AuthResponse {
        id,
        username,
        name,
        email,
        access_expires: session.access_expires,
    };
    Ok((
        StatusCode::CREATED,
        session_cookies(&session, state.secure_cookies),
        Json(response),
    ))
}

/// Logout - null the session fingerprint and clear both cookies.
async fn logout(
    State(state): State<UsersState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .users()
        .set_session_fingerprint(user.id, None)
        .await
        .db_err("Failed to clear session")?;

    Ok((
        StatusCode::OK,
        clear_session_cookies(state.secure_cookies),
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    ))
}

async fn get_profile(Auth(user): Auth) -> impl IntoResponse {
    Json(user)
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
}

async fn update_profile(
    State(state): State<UsersState>,
    Auth(user): Auth,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let email = payload
        .email
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let password = payload.password.filter(|s| !s.is_empty());

    if name.is_none() && email.is_none() && password.is_none() {
        return Err(ApiError::validation("No update data provided"));
    }

    // Validate everything before the first write so a rejected field does
    // not leave a partial update behind.
    if let Some(ref password) = password {
        if password.chars().count() < 6 {
            return Err(ApiError::validation(
                "Password must be at least 6 characters long",
            ));
        }
    }

    if let Some(ref email) = email {
        let taken = state
            .db
            .users()
            .email_taken_by_other(email, user.id)
            .await
            .db_err("Failed to check email")?;
        if taken {
            return Err(ApiError::validation(
                "Email already in use by another account",
            ));
        }
    }

    if name.is_some() || email.is_some() {
        state
            .db
            .users()
            .update_profile(user.id, name, email.as_deref())
            .await
            .db_err("Failed to update profile")?;
    }

    if let Some(password) = password {
        let password_hash = hash_password(&password)
            .map_err(|e| ApiError::persistence_error("Failed to hash password", e))?;
        // Also nulls the session fingerprint, logging out all sessions.
        state
            .db
            .users()
            .set_password(user.id, &password_hash)
            .await
            .db_err("Failed to update password")?;
    }

    let updated = state
        .db
        .users()
        .get_profile(user.id)
        .await
        .db_err("Failed to load profile")?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(updated))
}
