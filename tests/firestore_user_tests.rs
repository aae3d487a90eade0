// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User store tests against the Firestore emulator.
//!
//! Skipped unless FIRESTORE_EMULATOR_HOST is set.

use tube_accounts::db::FirestoreDb;
use tube_accounts::error::AppError;
use tube_accounts::models::User;

fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

macro_rules! require_emulator {
    () => {
        if !emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project", "(default)")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique suffix so runs against a shared emulator don't collide.
fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn test_user(suffix: &str) -> User {
    User {
        id: uuid::Uuid::new_v4().to_string(),
        username: format!("user{}", suffix),
        email: format!("user{}@example.com", suffix),
        full_name: "Emulator User".to_string(),
        password_hash: "hash".to_string(),
        avatar: "https://res.cloudinary.com/demo/image/upload/a.png".to_string(),
        cover_image: None,
        refresh_token: None,
        created_at: "2026-01-01T00:00:00Z".to_string(),
        updated_at: "2026-01-01T00:00:00Z".to_string(),
    }
}

#[tokio::test]
async fn test_create_and_find_user() {
    require_emulator!();
    let db = test_db().await;
    let suffix = unique_suffix();
    let user = test_user(&suffix);

    db.create_user(&user).await.unwrap();

    let by_id = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, user.username);

    let by_email = db.find_user_by_email(&user.email).await.unwrap().unwrap();
    assert_eq!(by_email.id, user.id);

    let by_username = db
        .find_user_by_username_or_email(&user.username, "nobody@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_username.id, user.id);

    assert!(db
        .find_user_by_username_or_email("nobody", "nobody@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_handles_conflict() {
    require_emulator!();
    let db = test_db().await;
    let suffix = unique_suffix();
    let first = test_user(&suffix);
    db.create_user(&first).await.unwrap();

    // Same email, fresh ID and username
    let mut same_email = test_user(&unique_suffix());
    same_email.email = first.email.clone();
    let err = db.create_user(&same_email).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(db.get_user(&same_email.id).await.unwrap().is_none());

    // The losing attempt must not hold its username
    let retry = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: format!("retry{}@example.com", suffix),
        ..same_email
    };
    db.create_user(&retry).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_same_email_one_wins() {
    require_emulator!();
    let db = test_db().await;
    let email = format!("race{}@example.com", unique_suffix());

    let attempts: Vec<_> = (0..4)
        .map(|_| {
            let db = db.clone();
            let mut user = test_user(&unique_suffix());
            user.email = email.clone();
            tokio::spawn(async move { db.create_user(&user).await })
        })
        .collect();

    let mut created = 0;
    for attempt in attempts {
        match attempt.await.unwrap() {
            Ok(()) => created += 1,
            Err(AppError::Conflict(_)) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
async fn test_refresh_token_field_update() {
    require_emulator!();
    let db = test_db().await;
    let user = test_user(&unique_suffix());
    db.create_user(&user).await.unwrap();

    db.set_refresh_token(&user.id, Some("token-1")).await.unwrap();
    db.set_refresh_token(&user.id, Some("token-2")).await.unwrap();
    let stored = db.get_user(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("token-2"));
    // Other fields are untouched by the masked update
    assert_eq!(stored.full_name, "Emulator User");

    db.set_refresh_token(&user.id, None).await.unwrap();
    let stored = db.get_user(&user.id).await.unwrap().unwrap();
    assert!(stored.refresh_token.is_none());
}

#[tokio::test]
async fn test_set_refresh_token_missing_user() {
    require_emulator!();
    let db = test_db().await;

    let result = db
        .set_refresh_token(&uuid::Uuid::new_v4().to_string(), Some("token"))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
