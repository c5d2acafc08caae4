// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer: credential store, refresh-token revocation set, catalog.
//!
//! Handlers only see the [`Store`] trait object; the backend is chosen at
//! startup (Firestore in production, in-memory for development and tests).

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{Category, Product, ProductFilter, User};
use async_trait::async_trait;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email reservations (document ID = normalized email), for uniqueness
    pub const USER_EMAILS: &str = "user_emails";
    /// Consumed or revoked refresh tokens (document ID = `{user_id}_{jti}`)
    pub const REVOKED_REFRESH_TOKENS: &str = "revoked_refresh_tokens";
    pub const CATEGORIES: &str = "categories";
    pub const PRODUCTS: &str = "products";
}

/// Users keyed by ID with a unique, case-insensitive email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// `email` must be normalized.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Insert a new user; fails with [`AppError::DuplicateEmail`] if the email is taken.
    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    /// Overwrite an existing user. The email is not allowed to change.
    async fn update_user(&self, user: &User) -> Result<(), AppError>;
}

/// Single-use bookkeeping for refresh tokens.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Atomically mark `(user_id, jti)` as used.
    ///
    /// Returns `true` if this call consumed the token, `false` if it had
    /// already been consumed or revoked.
    async fn consume_refresh_token(
        &self,
        user_id: &str,
        jti: &str,
        expires_at: u64,
    ) -> Result<bool, AppError>;
}

/// Categories and products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, AppError>;
    async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError>;
    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, AppError>;
    async fn upsert_category(&self, category: &Category) -> Result<(), AppError>;
    /// Returns `false` if nothing was deleted.
    async fn delete_category(&self, id: &str) -> Result<bool, AppError>;

    /// Matching products in no particular order.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError>;
    async fn get_product(&self, id: &str) -> Result<Option<Product>, AppError>;
    async fn upsert_product(&self, product: &Product) -> Result<(), AppError>;
    async fn delete_product(&self, id: &str) -> Result<bool, AppError>;
}

/// Everything the HTTP layer needs from storage.
pub trait Store: UserStore + RevocationStore + CatalogStore {}

impl<T: UserStore + RevocationStore + CatalogStore> Store for T {}

/// Shared handle stored in application state.
pub type SharedStore = Arc<dyn Store>;
