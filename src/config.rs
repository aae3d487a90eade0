// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Loaded once at startup and handed to services by reference; nothing reads
//! the process environment after that.

use std::env;

/// Default access token lifetime (1 day).
const DEFAULT_ACCESS_TOKEN_EXPIRY: &str = "1d";
/// Default refresh token lifetime (10 days).
const DEFAULT_REFRESH_TOKEN_EXPIRY: &str = "10d";
/// Default upload limit for avatar/cover images (5 MiB).
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Credentials for the Cloudinary upload API.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project hosting the Firestore database
    pub gcp_project_id: String,
    /// Firestore database name
    pub firestore_database: String,
    /// Keep users in process memory instead of Firestore (local dev only)
    pub use_in_memory_db: bool,
    /// Whether session cookies carry the `Secure` attribute
    pub cookie_secure: bool,
    /// Largest accepted multipart request body
    pub max_upload_bytes: usize,
    /// Access token lifetime in seconds
    pub access_token_expiry_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_expiry_secs: i64,

    // --- Secrets ---
    /// HS256 key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// HS256 key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Media upload credentials
    pub media: MediaConfig,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8000,
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            firestore_database: "(default)".to_string(),
            use_in_memory_db: true,
            cookie_secure: true,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            access_token_expiry_secs: 24 * 60 * 60,
            refresh_token_expiry_secs: 10 * 24 * 60 * 60,
            access_token_secret: b"test_access_key_32_bytes_minimum!".to_vec(),
            refresh_token_secret: b"test_refresh_key_32_bytes_minimum".to_vec(),
            media: MediaConfig {
                cloud_name: "test-cloud".to_string(),
                api_key: "test_api_key".to_string(),
                api_secret: "test_api_secret".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let access_token_expiry = env::var("ACCESS_TOKEN_EXPIRY")
            .unwrap_or_else(|_| DEFAULT_ACCESS_TOKEN_EXPIRY.to_string());
        let refresh_token_expiry = env::var("REFRESH_TOKEN_EXPIRY")
            .unwrap_or_else(|_| DEFAULT_REFRESH_TOKEN_EXPIRY.to_string());

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            firestore_database: env::var("FIRESTORE_DATABASE")
                .unwrap_or_else(|_| "(default)".to_string()),
            use_in_memory_db: parse_flag(env::var("USE_IN_MEMORY_DB").ok().as_deref(), false),
            cookie_secure: parse_flag(env::var("COOKIE_SECURE").ok().as_deref(), true),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            access_token_expiry_secs: parse_expiry(&access_token_expiry)
                .map_err(|e| ConfigError::Invalid("ACCESS_TOKEN_EXPIRY", e))?,
            refresh_token_expiry_secs: parse_expiry(&refresh_token_expiry)
                .map_err(|e| ConfigError::Invalid("REFRESH_TOKEN_EXPIRY", e))?,

            access_token_secret: required_secret("ACCESS_TOKEN_SECRET")?.into_bytes(),
            refresh_token_secret: required_secret("REFRESH_TOKEN_SECRET")?.into_bytes(),
            media: MediaConfig {
                cloud_name: required_secret("CLOUDINARY_CLOUD_NAME")?,
                api_key: required_secret("CLOUDINARY_API_KEY")?,
                api_secret: required_secret("CLOUDINARY_API_SECRET")?,
            },
        })
    }
}

fn required_secret(name: &'static str) -> Result<String, ConfigError> {
    let value = env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))?;
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value)
}

fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if v == "1" || v == "true" || v == "yes" => true,
        Some(v) if v == "0" || v == "false" || v == "no" => false,
        _ => default,
    }
}

/// Parse a token lifetime such as `15m`, `1d` or `3600` into seconds.
///
/// Bare numbers are seconds. Supported suffixes are `s`, `m`, `h` and `d`.
pub fn parse_expiry(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], c.to_ascii_lowercase()),
        Some(_) => (raw, 's'),
        None => return Err("empty duration".to_string()),
    };

    let value: i64 = digits
        .parse()
        .map_err(|_| format!("invalid duration '{}'", raw))?;
    if value <= 0 {
        return Err(format!("duration must be positive, got '{}'", raw));
    }

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        other => return Err(format!("unknown duration unit '{}'", other)),
    };

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("duration '{}' is too large", raw))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
