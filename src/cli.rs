//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use clap::Parser;
use tracing::{error, info};

const MIN_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Clinigate",
    about = "Clinic auth service with rotating refresh tokens"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "clinigate.db")]
    pub database: String,

    /// Deployment environment; "production" enables the Secure cookie flag
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub environment: String,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Read one token secret from the environment, scrubbing the variable after
/// the read so it cannot leak to child processes.
fn load_secret(var: &str) -> Option<Vec<u8>> {
    let Ok(secret) = std::env::var(var) else {
        error!("{} is required. Set it to a high-entropy value", var);
        return None;
    };
    // SAFETY: We're single-threaded at this point during startup,
    // and no other code is reading this environment variable.
    unsafe { std::env::remove_var(var) };

    if secret.len() < MIN_SECRET_LENGTH {
        error!(
            "{} is shorter than {} characters. Use a longer secret",
            var, MIN_SECRET_LENGTH
        );
        return None;
    }

    Some(secret.into_bytes())
}

/// Load the access and refresh token secrets from the environment.
/// Returns None and logs an error if either is missing, too short, or if
/// the two are not distinct.
pub fn load_token_secrets() -> Option<(Vec<u8>, Vec<u8>)> {
    let access = load_secret("ACCESS_TOKEN_SECRET")?;
    let refresh = load_secret("REFRESH_TOKEN_SECRET")?;

    if access == refresh {
        error!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must be distinct values");
        return None;
    }

    Some((access, refresh))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
    environment: &str,
) -> ServerConfig {
    ServerConfig {
        db,
        access_secret,
        refresh_secret,
        secure_cookies: environment == "production",
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
