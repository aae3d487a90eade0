// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod media;
pub mod password;
pub mod session;
pub mod token;

pub use media::{MediaService, UploadFile, UploadedMedia};
pub use session::{SessionError, SessionService, TokenPair};
pub use token::{AccessClaims, RefreshClaims, TokenSigner};
