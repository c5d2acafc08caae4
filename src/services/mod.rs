// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod password;
pub mod tokens;

pub use password::{hash_password, verify_password, PasswordError};
pub use tokens::{AccessClaims, IssuedRefreshToken, RefreshClaims, TokenError, TokenService};
