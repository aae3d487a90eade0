// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Tube-Accounts: user registration and session management
//!
//! This crate provides the backend API for registering users (with avatar
//! upload), logging in with access/refresh tokens carried in cookies,
//! rotating refresh tokens and logging out.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{MediaService, SessionService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub media: MediaService,
    pub sessions: SessionService,
}
