//! Access-token authentication gate.
//!
//! Dual-token system: short-lived access tokens (15 min, stateless) and
//! long-lived refresh tokens (7 days, fingerprinted in the database).
//! Protected endpoints take the [`Auth`] extractor, which verifies the
//! access token and attaches the user's non-sensitive profile.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, build_cookie, clear_cookie, get_cookie,
};
pub use errors::{AuthError, AuthErrorKind};
pub use extractors::{Auth, extract_access_token};
pub use ip::client_ip;
pub use state::HasAuthBackend;
