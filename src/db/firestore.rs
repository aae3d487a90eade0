// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed user operations.
//!
//! Two backends sit behind the same API:
//! - Firestore (production, or the emulator via `FIRESTORE_EMULATOR_HOST`)
//! - an in-process map, used by tests and offline local development

use crate::db::collections;
use crate::error::AppError;
use crate::models::User;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Commit attempts for a contended user creation.
const CREATE_USER_ATTEMPTS: u32 = 3;

/// Claim document in `usernames` / `emails`. Its ID is derived from the
/// handle, so two users can never hold the same one.
#[derive(Debug, Serialize, Deserialize)]
struct HandleClaim {
    user_id: String,
}

/// In-memory user collection.
///
/// `handles` reserves `username:` / `email:` keys so that uniqueness is
/// enforced atomically per key even under concurrent registration.
#[derive(Default)]
struct MemoryStore {
    users: DashMap<String, User>,
    handles: DashMap<String, String>,
}

#[derive(Clone)]
enum Backend {
    Firestore(firestore::FirestoreDb),
    Memory(Arc<MemoryStore>),
}

/// User database client.
#[derive(Clone)]
pub struct FirestoreDb {
    backend: Backend,
}

impl FirestoreDb {
    /// Connect to Firestore.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, database_id: &str) -> Result<Self, AppError> {
        let options = firestore::FirestoreDbOptions::new(project_id.to_string())
            .with_database_id(database_id.to_string());

        // The emulator accepts any token; skip real credential lookup.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(options).await;
        }

        let client = firestore::FirestoreDb::with_options(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(
            project = project_id,
            database = database_id,
            "Connected to Firestore"
        );

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(
        options: firestore::FirestoreDbOptions,
    ) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!("Connected to Firestore (Emulator/Unauthenticated)");

        Ok(Self {
            backend: Backend::Firestore(client),
        })
    }

    /// Create an in-memory database (tests and offline development).
    ///
    /// Data lives only as long as the process.
    pub fn new_mock() -> Self {
        Self {
            backend: Backend::Memory(Arc::new(MemoryStore::default())),
        }
    }

    // ─── Lookups ─────────────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => client
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(user_id)
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            Backend::Memory(store) => Ok(store.users.get(user_id).map(|u| u.clone())),
        }
    }

    /// Find a user by (normalised) email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let users: Vec<User> = client
                    .fluent()
                    .select()
                    .from(collections::USERS)
                    .filter(|q| q.for_all([q.field("email").eq(email)]))
                    .limit(1)
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(users.into_iter().next())
            }
            Backend::Memory(store) => Ok(store
                .handles
                .get(&email_key(email))
                .and_then(|id| store.users.get(id.value()).map(|u| u.clone()))),
        }
    }

    /// Find any user holding either the username or the email.
    pub async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let users: Vec<User> = client
                    .fluent()
                    .select()
                    .from(collections::USERS)
                    .filter(|q| {
                        q.for_any([
                            q.field("username").eq(username),
                            q.field("email").eq(email),
                        ])
                    })
                    .limit(1)
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(users.into_iter().next())
            }
            Backend::Memory(store) => {
                let id = store
                    .handles
                    .get(&username_key(username))
                    .or_else(|| store.handles.get(&email_key(email)))
                    .map(|id| id.value().clone());
                Ok(id.and_then(|id| store.users.get(&id).map(|u| u.clone())))
            }
        }
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Insert a new user.
    ///
    /// Fails with `Conflict` if the document ID, username or email is taken.
    /// On Firestore the username and email claims are written in the same
    /// transaction as the user, each with a must-not-exist precondition, so
    /// of two concurrent registrations for one handle exactly one commits.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match &self.backend {
            Backend::Firestore(client) => {
                let mut attempt = 1;
                loop {
                    match commit_new_user(client, user).await {
                        Ok(()) => return Ok(()),
                        Err(e) if is_precondition_conflict(&e) => {
                            tracing::info!(user_id = %user.id, "Registration lost a handle race");
                            return Err(AppError::Conflict("User already exists".to_string()));
                        }
                        Err(FirestoreError::DatabaseError(e))
                            if e.retry_possible && attempt < CREATE_USER_ATTEMPTS =>
                        {
                            tracing::warn!(attempt, error = %e, "Retrying user creation");
                            attempt += 1;
                        }
                        Err(e) => {
                            return Err(AppError::Database(format!(
                                "Failed to create user: {}",
                                e
                            )))
                        }
                    }
                }
            }
            Backend::Memory(store) => {
                let username = username_key(&user.username);
                let email = email_key(&user.email);

                reserve_handle(store, &username, &user.id)?;
                if let Err(e) = reserve_handle(store, &email, &user.id) {
                    store.handles.remove(&username);
                    return Err(e);
                }
                store.users.insert(user.id.clone(), user.clone());
                Ok(())
            }
        }
    }

    /// Overwrite (or clear, with `None`) the stored refresh token.
    ///
    /// Only `refresh_token` and `updated_at` are written; the rest of the
    /// record is left as-is. Returns `NotFound` if the user does not exist.
    pub async fn set_refresh_token(
        &self,
        user_id: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        let now = crate::time_utils::format_utc_rfc3339(chrono::Utc::now());

        match &self.backend {
            Backend::Firestore(client) => {
                let mut user = self
                    .get_user(user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
                user.refresh_token = refresh_token.map(str::to_string);
                user.updated_at = now;

                let _: () = client
                    .fluent()
                    .update()
                    .fields(["refresh_token", "updated_at"])
                    .in_col(collections::USERS)
                    .document_id(user_id)
                    .object(&user)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(())
            }
            Backend::Memory(store) => {
                let mut user = store
                    .users
                    .get_mut(user_id)
                    .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
                user.refresh_token = refresh_token.map(str::to_string);
                user.updated_at = now;
                Ok(())
            }
        }
    }
}

/// Write the user and its username/email claims in one transaction. Every
/// write must create a new document, so the commit fails if any is taken.
async fn commit_new_user(
    client: &firestore::FirestoreDb,
    user: &User,
) -> Result<(), FirestoreError> {
    let claim = HandleClaim {
        user_id: user.id.clone(),
    };

    let mut transaction = client.begin_transaction().await?;

    for (collection, handle) in [
        (collections::USERNAMES, &user.username),
        (collections::EMAILS, &user.email),
    ] {
        client
            .fluent()
            .update()
            .in_col(collection)
            .precondition(FirestoreWritePrecondition::Exists(false))
            .document_id(handle_doc_id(handle))
            .object(&claim)
            .add_to_transaction(&mut transaction)?;
    }

    client
        .fluent()
        .update()
        .in_col(collections::USERS)
        .precondition(FirestoreWritePrecondition::Exists(false))
        .document_id(&user.id)
        .object(user)
        .add_to_transaction(&mut transaction)?;

    transaction.commit().await?;
    Ok(())
}

/// Document ID for a username/email claim. Hashed because emails may contain
/// characters Firestore does not allow in IDs.
fn handle_doc_id(handle: &str) -> String {
    hex::encode(Sha256::digest(handle.as_bytes()))
}

/// A must-not-exist precondition failed at commit.
fn is_precondition_conflict(err: &FirestoreError) -> bool {
    match err {
        FirestoreError::DataConflictError(_) => true,
        FirestoreError::DatabaseError(e) => e.public.code == "FailedPrecondition",
        _ => false,
    }
}

fn username_key(username: &str) -> String {
    format!("username:{}", username)
}

fn email_key(email: &str) -> String {
    format!("email:{}", email)
}

fn reserve_handle(store: &MemoryStore, key: &str, user_id: &str) -> Result<(), AppError> {
    match store.handles.entry(key.to_string()) {
        Entry::Occupied(_) => Err(AppError::Conflict("User already exists".to_string())),
        Entry::Vacant(slot) => {
            slot.insert(user_id.to_string());
            Ok(())
        }
    }
}
