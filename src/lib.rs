// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User Registry: a small JSON API for managing user records.
//!
//! This crate provides create/list/fetch/update/delete endpoints for users
//! backed by a SQLite table that enforces unique logins.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::UserStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: UserStore,
}
