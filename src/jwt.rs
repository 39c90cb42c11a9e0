//! JWT token generation and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token (15 minutes) - stateless
    Access,
    /// Long-lived refresh token (7 days) - fingerprinted in the database
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user id)
    pub sub: i64,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens. The random jti makes every minted token
/// unique, so its fingerprint always differs from the one it replaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// JWT ID (random per mint)
    pub jti: String,
    /// Subject (user id)
    pub sub: i64,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for JWT operations.
///
/// Access and refresh tokens are signed with independent secrets so that
/// compromising one key space does not forge the other token type.
#[derive(Clone)]
pub struct JwtConfig {
    access_encoding_key: EncodingKey,
    access_decoding_key: DecodingKey,
    refresh_encoding_key: EncodingKey,
    refresh_decoding_key: DecodingKey,
}

/// Result of generating a token.
#[derive(Debug, Clone)]
pub struct TokenResult {
    /// The JWT token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds
    pub duration: u64,
}

fn unix_now() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secrets.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access_encoding_key: EncodingKey::from_secret(access_secret),
            access_decoding_key: DecodingKey::from_secret(access_secret),
            refresh_encoding_key: EncodingKey::from_secret(refresh_secret),
            refresh_decoding_key: DecodingKey::from_secret(refresh_secret),
        }
    }

    /// Generate an access token for a user.
    /// Access tokens are short-lived (15 minutes) and stateless.
    pub fn generate_access_token(&self, user_id: i64) -> Result<TokenResult, JwtError> {
        let now = unix_now()?;
        let exp = now + ACCESS_TOKEN_DURATION_SECS;

        let claims = AccessClaims {
            sub: user_id,
            token_type: TokenType::Access,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.access_encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(TokenResult {
            token,
            issued_at: now,
            expires_at: exp,
            duration: ACCESS_TOKEN_DURATION_SECS,
        })
    }

    /// Generate a refresh token for a user.
    /// Refresh tokens are long-lived (7 days); the caller persists a digest
    /// of the token so the latest issued one can be recognized.
    pub fn generate_refresh_token(&self, user_id: i64) -> Result<TokenResult, JwtError> {
        let now = unix_now()?;
        let exp = now + REFRESH_TOKEN_DURATION_SECS;

        let claims = RefreshClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id,
            token_type: TokenType::Refresh,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.refresh_encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(TokenResult {
            token,
            issued_at: now,
            expires_at: exp,
            duration: REFRESH_TOKEN_DURATION_SECS,
        })
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let claims: AccessClaims = self.decode(token, &self.access_decoding_key)?;

        if claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }
        Self::check_max_age(claims.iat, ACCESS_TOKEN_DURATION_SECS)?;

        Ok(claims)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let claims: RefreshClaims = self.decode(token, &self.refresh_decoding_key)?;

        if claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }
        Self::check_max_age(claims.iat, REFRESH_TOKEN_DURATION_SECS)?;

        Ok(claims)
    }

    fn decode<C: serde::de::DeserializeOwned>(
        &self,
        token: &str,
        key: &DecodingKey,
    ) -> Result<C, JwtError> {
        // HS256 only; the algorithm allow-list rejects substitution attacks.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        jsonwebtoken::decode::<C>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(JwtError::from_decode)
    }

    /// Cap the token age server-side, independent of the exp claim.
    fn check_max_age(iat: u64, max_age: u64) -> Result<(), JwtError> {
        if unix_now()? > iat.saturating_add(max_age) {
            return Err(JwtError::Expired);
        }
        Ok(())
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Token is past its expiry or over the server-side max age
    Expired,
    /// Token has an unmet activation time (nbf)
    NotYetValid,
    /// Malformed token or signature mismatch
    Invalid(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
}

impl JwtError {
    fn from_decode(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::ImmatureSignature => JwtError::NotYetValid,
            _ => JwtError::Invalid(e),
        }
    }
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Expired => write!(f, "Token expired"),
            JwtError::NotYetValid => write!(f, "Token not yet valid"),
            JwtError::Invalid(e) => write!(f, "Invalid token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
        }
    }
}

impl std::error::Error for JwtError {}
