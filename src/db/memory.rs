// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Process-local store backed by `DashMap`.
//!
//! Used for local development and tests. Uniqueness guarantees rely on
//! `DashMap` entry locking, so concurrent requests behave as with Firestore's
//! create-only inserts.

use super::{CatalogStore, RevocationStore, UserStore};
use crate::error::AppError;
use crate::models::{Category, Product, ProductFilter, User};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// In-memory store. Cloning shares the underlying maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<DashMap<String, User>>,
    /// normalized email -> user ID
    emails: Arc<DashMap<String, String>>,
    /// (user ID, jti) -> token expiry (Unix seconds)
    consumed_refresh_tokens: Arc<DashMap<(String, String), u64>>,
    categories: Arc<DashMap<String, Category>>,
    products: Arc<DashMap<String, Product>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop revocation entries for tokens that have expired anyway.
    fn purge_expired_revocations(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.consumed_refresh_tokens
            .retain(|_, expires_at| *expires_at >= now);
    }

    #[cfg(test)]
    fn revocation_count(&self) -> usize {
        self.consumed_refresh_tokens.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let Some(id) = self.emails.get(email).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        match self.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => return Err(AppError::DuplicateEmail),
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let mut existing = self
            .users
            .get_mut(&user.id)
            .ok_or(AppError::UserNotFound)?;
        if existing.email != user.email {
            return Err(AppError::BadRequest("Email cannot be changed".to_string()));
        }
        *existing = user.clone();
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for MemoryStore {
    async fn consume_refresh_token(
        &self,
        user_id: &str,
        jti: &str,
        expires_at: u64,
    ) -> Result<bool, AppError> {
        let consumed = match self
            .consumed_refresh_tokens
            .entry((user_id.to_string(), jti.to_string()))
        {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(expires_at);
                true
            }
        };
        if consumed {
            self.purge_expired_revocations();
        }
        Ok(consumed)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        Ok(self.categories.iter().map(|c| c.value().clone()).collect())
    }

    async fn get_category(&self, id: &str) -> Result<Option<Category>, AppError> {
        Ok(self.categories.get(id).map(|c| c.clone()))
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>, AppError> {
        Ok(self
            .categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value().clone()))
    }

    async fn upsert_category(&self, category: &Category) -> Result<(), AppError> {
        self.categories
            .insert(category.id.clone(), category.clone());
        Ok(())
    }

    async fn delete_category(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.categories.remove(id).is_some())
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        Ok(self
            .products
            .iter()
            .filter(|p| filter.matches(p.value()))
            .map(|p| p.value().clone())
            .collect())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, AppError> {
        Ok(self.products.get(id).map(|p| p.clone()))
    }

    async fn upsert_product(&self, product: &Product) -> Result<(), AppError> {
        self.products.insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn delete_product(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.products.remove(id).is_some())
    }
}
