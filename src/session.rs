//! Session issuance: minting an access/refresh token pair and rotating the
//! stored refresh-token fingerprint.

use chrono::{DateTime, TimeZone, Utc};

use crate::db::Database;
use crate::jwt::{JwtConfig, JwtError};
use crate::password::fingerprint;

/// A freshly issued token pair, ready to be placed in cookies by the caller.
/// The raw tokens travel only via cookies, never in a JSON body.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Cookie Max-Age for the access token, in seconds.
    pub access_max_age: u64,
    /// Cookie Max-Age for the refresh token, in seconds.
    pub refresh_max_age: u64,
    /// When the access token expires.
    pub access_expires: DateTime<Utc>,
}

/// Errors from session issuance.
#[derive(Debug)]
pub enum IssueError {
    /// Token minting failed.
    Token(JwtError),
    /// The fingerprint write failed; no tokens from this call are valid.
    Persistence(sqlx::Error),
    /// The user id does not exist.
    UserNotFound,
}

impl std::fmt::Display for IssueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueError::Token(e) => write!(f, "Failed to mint tokens: {}", e),
            IssueError::Persistence(e) => write!(f, "Failed to persist session: {}", e),
            IssueError::UserNotFound => write!(f, "User not found"),
        }
    }
}

impl std::error::Error for IssueError {}

/// Mint an access/refresh token pair for a user and persist the refresh
/// token's fingerprint, overwriting any prior value. This is the rotation
/// point: exactly one session-store write per call.
///
/// On any failure no tokens from this call may be treated as valid and the
/// caller must not set cookies.
pub async fn issue_session(
    db: &Database,
    jwt: &JwtConfig,
    user_id: i64,
) -> Result<IssuedSession, IssueError> {
    let access = jwt
        .generate_access_token(user_id)
        .map_err(IssueError::Token)?;
    let refresh = jwt
        .generate_refresh_token(user_id)
        .map_err(IssueError::Token)?;

    let digest = fingerprint(&refresh.token);
    let updated = db
        .users()
        .set_session_fingerprint(user_id, Some(&digest))
        .await
        .map_err(IssueError::Persistence)?;
    if !updated {
        return Err(IssueError::UserNotFound);
    }

    let access_expires = Utc
        .timestamp_opt(access.expires_at as i64, 0)
        .single()
        .unwrap_or_else(Utc::now);

    Ok(IssuedSession {
        access_token: access.token,
        refresh_token: refresh.token,
        access_max_age: access.duration,
        refresh_max_age: refresh.duration,
        access_expires,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_jwt() -> JwtConfig {
        JwtConfig::new(b"access-secret-for-testing", b"refresh-secret-for-testing")
    }

    async fn test_user(db: &Database) -> i64 {
        db.users()
            .create("alice", "Alice A", "alice@x.com", "hash")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_issue_persists_fingerprint() {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = test_jwt();
        let id = test_user(&db).await;

        let session = issue_session(&db, &jwt, id).await.unwrap();

        let stored = db
            .users()
            .get_session_fingerprint(id)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(stored, fingerprint(&session.refresh_token));

        // Both tokens verify against their own key spaces
        assert_eq!(jwt.validate_access_token(&session.access_token).unwrap().sub, id);
        assert_eq!(
            jwt.validate_refresh_token(&session.refresh_token).unwrap().sub,
            id
        );
    }

    #[tokio::test]
    async fn test_issue_rotates_previous_fingerprint() {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = test_jwt();
        let id = test_user(&db).await;

        let first = issue_session(&db, &jwt, id).await.unwrap();
        let second = issue_session(&db, &jwt, id).await.unwrap();

        let stored = db
            .users()
            .get_session_fingerprint(id)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(stored, fingerprint(&second.refresh_token));
        assert_ne!(stored, fingerprint(&first.refresh_token));
    }

    #[tokio::test]
    async fn test_issue_unknown_user_fails() {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = test_jwt();

        let result = issue_session(&db, &jwt, 999).await;
        assert!(matches!(result, Err(IssueError::UserNotFound)));
    }
}
