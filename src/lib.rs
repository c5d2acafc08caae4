// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Menuboard: restaurant storefront backend with cookie sessions.
//!
//! This crate provides the HTTP API (session endpoints, catalog management,
//! public menu) and a session-aware API client that recovers from expired
//! access tokens with a single shared refresh.

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::SharedStore;
use services::TokenService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SharedStore,
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(config: Config, db: SharedStore) -> Self {
        let tokens = TokenService::from_config(&config);
        Self { config, db, tokens }
    }
}
