//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Username claims, one document per taken username.
    pub const USERNAMES: &str = "usernames";
    /// Email claims, one document per taken email.
    pub const EMAILS: &str = "emails";
}
