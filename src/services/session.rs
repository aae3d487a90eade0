// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token issuance, rotation and revocation.
//!
//! Each user has at most one live refresh token: the one stored on the user
//! record. Issuing a pair overwrites it, so any earlier refresh token stops
//! working. Concurrent logins for the same user race on that field and the
//! last write wins.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::User;
use crate::services::token::TokenSigner;
use serde::Serialize;
use subtle::ConstantTimeEq;

/// Freshly issued access + refresh tokens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Why token issuance failed. The cause is kept for logs; clients only ever
/// see the generic 500 from [`AppError::TokenGeneration`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("failed to sign token: {0}")]
    Signing(#[source] anyhow::Error),

    #[error("failed to read or persist user: {0}")]
    Store(#[source] Box<AppError>),
}

/// Issues and rotates session tokens against the user store.
#[derive(Clone)]
pub struct SessionService {
    db: FirestoreDb,
    signer: TokenSigner,
}

impl SessionService {
    pub fn new(db: FirestoreDb, signer: TokenSigner) -> Self {
        Self { db, signer }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Issue a new token pair for `user_id` and make its refresh token the
    /// only one accepted for that user.
    pub async fn issue_tokens(&self, user_id: &str) -> Result<TokenPair, SessionError> {
        let user = self
            .db
            .get_user(user_id)
            .await
            .map_err(|e| SessionError::Store(Box::new(e)))?
            .ok_or_else(|| SessionError::UserNotFound(user_id.to_string()))?;

        let access_token = self
            .signer
            .sign_access(&user)
            .map_err(SessionError::Signing)?;
        let refresh_token = self
            .signer
            .sign_refresh(&user.id)
            .map_err(SessionError::Signing)?;

        self.db
            .set_refresh_token(&user.id, Some(&refresh_token))
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => SessionError::UserNotFound(user.id.clone()),
                other => SessionError::Store(Box::new(other)),
            })?;

        tracing::debug!(user_id = %user.id, "Issued session tokens");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new pair, invalidating the presented one.
    pub async fn refresh(&self, presented: &str) -> Result<(User, TokenPair), AppError> {
        let claims = self.signer.verify_refresh(presented).map_err(|e| {
            tracing::debug!(error = %e, "Rejected refresh token");
            AppError::Unauthorized("Invalid refresh token".to_string())
        })?;

        let user = self
            .db
            .get_user(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid refresh token".to_string()))?;

        let matches_stored = user
            .refresh_token
            .as_deref()
            .map(|stored| bool::from(stored.as_bytes().ct_eq(presented.as_bytes())))
            .unwrap_or(false);

        if !matches_stored {
            tracing::warn!(user_id = %user.id, "Refresh token is not the stored one");
            return Err(AppError::Unauthorized(
                "Refresh token is expired or used".to_string(),
            ));
        }

        let tokens = self.issue_tokens(&user.id).await?;
        Ok((user, tokens))
    }

    /// Forget the stored refresh token so it can no longer be exchanged.
    pub async fn revoke(&self, user_id: &str) -> Result<(), AppError> {
        self.db.set_refresh_token(user_id, None).await?;
        tracing::debug!(user_id, "Revoked refresh token");
        Ok(())
    }
}
