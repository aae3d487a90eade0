// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JWT compatibility tests.
//!
//! These decode tokens produced by the signer with plain `jsonwebtoken`
//! calls, catching claim-format or algorithm drift between the issuing side
//! and whatever else consumes the tokens.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tube_accounts::config::Config;
use tube_accounts::models::User;
use tube_accounts::services::TokenSigner;

/// Access claims as external consumers see them.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessClaims {
    sub: String,
    email: String,
    username: String,
    full_name: String,
    exp: usize,
    iat: usize,
    jti: String,
}

fn sample_user() -> User {
    User {
        id: "5f0c3f5e-2d6c-4c47-9d1f-7f7b9e2f0a11".to_string(),
        username: "judy".to_string(),
        email: "judy@example.com".to_string(),
        full_name: "Judy Hopps".to_string(),
        password_hash: String::new(),
        avatar: String::new(),
        cover_image: None,
        refresh_token: None,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

#[test]
fn test_access_token_decodes_with_hs256() {
    let config = Config::default();
    let signer = TokenSigner::new(&config);
    let token = signer.sign_access(&sample_user()).unwrap();

    let key = DecodingKey::from_secret(&config.access_token_secret);
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<AccessClaims>(&token, &key, &validation)
        .expect("Failed to decode JWT - check Claims struct compatibility");

    assert_eq!(data.claims.sub, "5f0c3f5e-2d6c-4c47-9d1f-7f7b9e2f0a11");
    assert_eq!(data.claims.email, "judy@example.com");
    assert_eq!(data.claims.full_name, "Judy Hopps");
    assert!(data.claims.exp > data.claims.iat);
    assert!(!data.claims.jti.is_empty());
}

#[test]
fn test_refresh_token_expiration_is_configured_lifetime() {
    let config = Config {
        refresh_token_expiry_secs: 3 * 86400,
        ..Default::default()
    };
    let signer = TokenSigner::new(&config);
    let token = signer.sign_refresh("user-42").unwrap();

    let claims = signer.verify_refresh(&token).unwrap();
    assert!(claims.exp >= now() + 3 * 86400 - 5);
    assert!(claims.exp <= now() + 3 * 86400 + 5);
}

#[test]
fn test_foreign_secret_rejected() {
    let signer = TokenSigner::new(&Config::default());

    let claims = AccessClaims {
        sub: "intruder".to_string(),
        email: "x@example.com".to_string(),
        username: "x".to_string(),
        full_name: "X".to_string(),
        exp: now() + 3600,
        iat: now(),
        jti: "forged".to_string(),
    };
    let forged = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"not-the-configured-secret"),
    )
    .unwrap();

    assert!(signer.verify_access(&forged).is_err());
}

#[test]
fn test_expired_access_token_rejected() {
    let config = Config::default();
    let signer = TokenSigner::new(&config);

    let claims = AccessClaims {
        sub: "user".to_string(),
        email: "x@example.com".to_string(),
        username: "x".to_string(),
        full_name: "X".to_string(),
        exp: now() - 300,
        iat: now() - 600,
        jti: "old".to_string(),
    };
    let expired = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&config.access_token_secret),
    )
    .unwrap();

    assert!(signer.verify_access(&expired).is_err());
}
