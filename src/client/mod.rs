// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API client with transparent session refresh.

pub mod api;
pub mod coordinator;
pub mod error;

pub use api::{ApiClient, ApiClientBuilder};
pub use coordinator::{RefreshCoordinator, RefreshFailed};
pub use error::ClientError;
