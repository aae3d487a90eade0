// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use crate::services::password;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// User record stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID (also used as document ID)
    pub id: String,
    /// Unique login handle, stored lowercase
    pub username: String,
    /// Unique email address, stored lowercase
    pub email: String,
    pub full_name: String,
    /// Argon2id PHC string
    pub password_hash: String,
    /// Hosted avatar URL
    pub avatar: String,
    /// Hosted cover image URL
    #[serde(default)]
    pub cover_image: Option<String>,
    /// The only refresh token currently accepted for this user
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Check a plaintext password against the stored hash.
    pub async fn is_password_correct(&self, candidate: &str) -> anyhow::Result<bool> {
        password::verify_password_blocking(candidate.to_string(), self.password_hash.clone())
            .await
    }

    /// Public view with credentials stripped.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar: self.avatar.clone(),
            cover_image: self.cover_image.clone().unwrap_or_default(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }
}

/// User as returned by the API. Never carries the password hash or refresh token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: String,
    pub updated_at: String,
}
