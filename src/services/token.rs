// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT signing and verification for access and refresh tokens.
//!
//! Both token kinds are HS256 but use separate keys, so an access token can
//! never be replayed as a refresh token (or the reverse).

use crate::config::Config;
use crate::models::User;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Claims carried by access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub username: String,
    pub full_name: String,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Unique token ID
    pub jti: String,
}

/// Claims carried by refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    /// Subject (user ID)
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

/// Signs and verifies session tokens with the configured keys and lifetimes.
#[derive(Clone)]
pub struct TokenSigner {
    access_key: Vec<u8>,
    refresh_key: Vec<u8>,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenSigner {
    pub fn new(config: &Config) -> Self {
        Self {
            access_key: config.access_token_secret.clone(),
            refresh_key: config.refresh_token_secret.clone(),
            access_ttl_secs: config.access_token_expiry_secs,
            refresh_ttl_secs: config.refresh_token_expiry_secs,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    /// Create an access token embedding the user's identity.
    pub fn sign_access(&self, user: &User) -> anyhow::Result<String> {
        let now = unix_now()?;
        let claims = AccessClaims {
            sub: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            iat: now,
            exp: now + self.access_ttl_secs as usize,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.access_key),
        )?)
    }

    /// Create a refresh token carrying only the user ID.
    pub fn sign_refresh(&self, user_id: &str) -> anyhow::Result<String> {
        let now = unix_now()?;
        let claims = RefreshClaims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + self.refresh_ttl_secs as usize,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.refresh_key),
        )?)
    }

    /// Verify signature and expiry of an access token.
    pub fn verify_access(&self, token: &str) -> jsonwebtoken::errors::Result<AccessClaims> {
        let key = DecodingKey::from_secret(&self.access_key);
        let validation = Validation::new(Algorithm::HS256);
        decode::<AccessClaims>(token, &key, &validation).map(|data| data.claims)
    }

    /// Verify signature and expiry of a refresh token.
    pub fn verify_refresh(&self, token: &str) -> jsonwebtoken::errors::Result<RefreshClaims> {
        let key = DecodingKey::from_secret(&self.refresh_key);
        let validation = Validation::new(Algorithm::HS256);
        decode::<RefreshClaims>(token, &key, &validation).map(|data| data.claims)
    }
}

fn unix_now() -> anyhow::Result<usize> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize)
}
