use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// Full user record, including the stored password hash and the session
/// fingerprint slot. Only the login and refresh paths load this; everything
/// else goes through [`Profile`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// Digest of the currently valid refresh token; NULL = no live session.
    pub session_fingerprint: Option<String>,
}

/// Non-sensitive user fields, safe to attach to a request or echo to the
/// client. Never carries the password hash.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the user id.
    /// Username and email are expected pre-normalized to lowercase.
    pub async fn create(
        &self,
        username: &str,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (username, name, email, password_hash) VALUES (?, ?, ?, ?)",
        )
        .bind(username)
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by username, including credential fields.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, name, email, password_hash, session_fingerprint
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a user by id, including credential fields.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, username, name, email, password_hash, session_fingerprint
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get the non-sensitive profile for a user.
    pub async fn get_profile(&self, id: i64) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as("SELECT id, username, name, email FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Overwrite the session fingerprint slot for a user.
    /// `None` invalidates all outstanding refresh tokens.
    /// Returns false when the user id does not exist.
    pub async fn set_session_fingerprint(
        &self,
        id: i64,
        digest: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET session_fingerprint = ? WHERE id = ?")
            .bind(digest)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Read the session fingerprint slot.
    /// Outer `None` = no such user; inner `None` = no live session.
    pub async fn get_session_fingerprint(
        &self,
        id: i64,
    ) -> Result<Option<Option<String>>, sqlx::Error> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT session_fingerprint FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    /// Update name and/or email. `None` leaves the field untouched.
    /// Returns false when the user id does not exist.
    pub async fn update_profile(
        &self,
        id: i64,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET name = COALESCE(?, name), email = COALESCE(?, email) WHERE id = ?",
        )
        .bind(name)
        .bind(email)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the password hash and null the session fingerprint in the
    /// same statement, forcibly logging out all sessions.
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, session_fingerprint = NULL WHERE id = ?",
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check whether a username or email is already registered.
    pub async fn username_or_email_taken(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Check whether an email belongs to a different user.
    pub async fn email_taken_by_other(&self, email: &str, id: i64) -> Result<bool, sqlx::Error> {
        let count: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
                .bind(email)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }
}
