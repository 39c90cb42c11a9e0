//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Why the auth gate rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No bearer header and no access-token cookie
    NoToken,
    /// Access token past its lifetime
    Expired,
    /// Malformed token, bad signature, or wrong token type
    Invalid,
    /// Token activation time not yet reached
    NotYetValid,
    /// Verified token, but the user no longer exists
    UserNotFound,
    /// Datastore failure while loading the user
    Backend,
}

/// Auth gate rejection. Returns the JSON error envelope without touching
/// cookies, so an expired access token never destroys the refresh token.
#[derive(Debug)]
pub struct AuthError {
    kind: AuthErrorKind,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::NoToken
            | AuthErrorKind::Expired
            | AuthErrorKind::Invalid
            | AuthErrorKind::NotYetValid
            | AuthErrorKind::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthErrorKind::Backend => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NoToken => "Access denied. No token provided.",
            AuthErrorKind::Expired => "Session expired. Please log in again.",
            // UserNotFound deliberately shares the invalid-token message so
            // the gate cannot be used to enumerate accounts.
            AuthErrorKind::Invalid | AuthErrorKind::UserNotFound => {
                "Invalid token. Please log in again."
            }
            AuthErrorKind::NotYetValid => "Token not yet active. Please try again.",
            AuthErrorKind::Backend => "Authentication error occurred.",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            status: &'static str,
            message: &'static str,
            timestamp: String,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                status: "error",
                message: self.message(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_not_found_message_matches_invalid() {
        // No account enumeration through the gate
        assert_eq!(
            AuthError::new(AuthErrorKind::UserNotFound).message(),
            AuthError::new(AuthErrorKind::Invalid).message()
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AuthError::new(AuthErrorKind::NoToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::new(AuthErrorKind::Expired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::new(AuthErrorKind::Backend).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
